//! Split options and configuration.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default size threshold: 9 MiB, just under common 10 MB attachment limits.
pub const DEFAULT_THRESHOLD: u64 = 9 * 1024 * 1024;

/// Options controlling how a document is partitioned.
#[derive(Debug, Clone)]
pub struct SplitOptions {
    /// Serialized size (bytes) at which the current part is closed
    pub threshold: u64,

    /// What happens to the page that reaches the threshold
    pub overflow: OverflowPolicy,

    /// Where measurement serializations are written
    pub measure: MeasureMode,

    /// How parts are published to an output directory
    pub publish: PublishMode,

    /// Cooperative cancellation, checked before each page
    pub cancel: Option<CancelFlag>,
}

impl SplitOptions {
    /// Create new split options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the size threshold in bytes.
    pub fn with_threshold(mut self, bytes: u64) -> Self {
        self.threshold = bytes;
        self
    }

    /// Set the overflow policy.
    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow = policy;
        self
    }

    /// Move overflowing pages to the next part.
    pub fn strict(mut self) -> Self {
        self.overflow = OverflowPolicy::Strict;
        self
    }

    /// Set the measurement scratch mode.
    pub fn with_measure_mode(mut self, mode: MeasureMode) -> Self {
        self.measure = mode;
        self
    }

    /// Set the publish mode.
    pub fn with_publish_mode(mut self, mode: PublishMode) -> Self {
        self.publish = mode;
        self
    }

    /// Publish all parts at once, or none on failure.
    pub fn atomic(mut self) -> Self {
        self.publish = PublishMode::Atomic;
        self
    }

    /// Attach a cancel flag.
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Check the options before a run.
    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(Error::InvalidThreshold(
                "threshold must be at least 1 byte".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            overflow: OverflowPolicy::Lenient,
            measure: MeasureMode::InMemory,
            publish: PublishMode::Immediate,
            cancel: None,
        }
    }
}

/// Placement of the page whose addition reaches the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Keep the page in the part being closed; parts may exceed the threshold
    #[default]
    Lenient,
    /// Move the page to the next part; only a lone page may exceed the threshold
    Strict,
}

/// Scratch location used by `measure()`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MeasureMode {
    /// Count serialized bytes without keeping them
    #[default]
    InMemory,
    /// Serialize into a temporary file and read its length
    TempFile {
        /// Directory for scratch files (system temp dir if `None`)
        dir: Option<PathBuf>,
    },
}

/// How a directory sink publishes parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishMode {
    /// Write each part as soon as it is finalized
    #[default]
    Immediate,
    /// Stage parts and move them into place only after the last one
    Atomic,
}

/// Shared flag for cancelling a run from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a lowered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Parse a human-friendly byte size.
///
/// Accepts bare byte counts (`"1048576"`), decimal units (`"500KB"`,
/// `"9MB"`, `"1GB"`) and binary units (`"500K"`, `"9MiB"`, `"1G"`).
/// Units are case-insensitive and fractional values are allowed (`"9.5MiB"`).
pub fn parse_byte_size(input: &str) -> Result<u64> {
    let s = input.trim();
    if s.is_empty() {
        return Err(Error::InvalidThreshold("empty size".to_string()));
    }

    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "kb" => 1_000,
        "mb" => 1_000_000,
        "gb" => 1_000_000_000,
        "k" | "kib" => 1 << 10,
        "m" | "mib" => 1 << 20,
        "g" | "gib" => 1 << 30,
        other => {
            return Err(Error::InvalidThreshold(format!(
                "unknown unit '{}' in '{}'",
                other, input
            )))
        }
    };

    let value: f64 = number
        .parse()
        .map_err(|_| Error::InvalidThreshold(format!("invalid number in '{}'", input)))?;
    let bytes = (value * multiplier as f64).round();
    if !bytes.is_finite() || bytes < 1.0 || bytes > u64::MAX as f64 {
        return Err(Error::InvalidThreshold(format!(
            "'{}' is not a usable size",
            input
        )));
    }
    Ok(bytes as u64)
}
