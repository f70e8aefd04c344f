//! Summary of a split run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::options::OverflowPolicy;
use crate::partition::Part;
use crate::sink::WrittenPart;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without whitespace
    Compact,
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitReport {
    /// Document name
    pub document: String,
    /// Input file, when the source was read from disk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    /// Pages in the source
    pub page_count: usize,
    /// Threshold in bytes
    pub threshold: u64,
    /// Overflow policy used
    pub overflow: OverflowPolicy,
    /// Parts in sequence order
    pub parts: Vec<PartSummary>,
}

/// One emitted part. Page numbers are 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSummary {
    /// Sequence number, starting at 1
    pub sequence: u32,
    /// First page in the part
    pub first_page: usize,
    /// Last page in the part
    pub last_page: usize,
    /// Number of pages
    pub page_count: usize,
    /// Serialized size in bytes
    pub bytes: u64,
    /// Written file, when the part went to a directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl SplitReport {
    /// Create an empty report.
    pub fn new(
        document: impl Into<String>,
        page_count: usize,
        threshold: u64,
        overflow: OverflowPolicy,
    ) -> Self {
        Self {
            document: document.into(),
            source: None,
            page_count,
            threshold,
            overflow,
            parts: Vec::new(),
        }
    }

    /// Record an emitted part.
    pub fn record(&mut self, part: &Part) {
        self.parts.push(PartSummary {
            sequence: part.sequence,
            first_page: part.first_page() + 1,
            last_page: part.last_page() + 1,
            page_count: part.page_count(),
            bytes: part.size(),
            path: None,
        });
    }

    /// Fill in file locations from a directory sink.
    pub fn attach_paths(&mut self, written: &[WrittenPart]) {
        for summary in &mut self.parts {
            if let Some(w) = written.iter().find(|w| w.sequence == summary.sequence) {
                summary.path = Some(w.path.clone());
            }
        }
    }

    /// Number of parts.
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Combined size of all parts.
    pub fn total_bytes(&self) -> u64 {
        self.parts.iter().map(|p| p.bytes).sum()
    }

    /// Largest part, if any.
    pub fn largest_part(&self) -> Option<&PartSummary> {
        self.parts.iter().max_by_key(|p| p.bytes)
    }

    /// Parts larger than the threshold.
    pub fn oversized_parts(&self) -> impl Iterator<Item = &PartSummary> {
        self.parts.iter().filter(move |p| p.bytes > self.threshold)
    }

    /// Serialize to JSON.
    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        let result = match format {
            JsonFormat::Pretty => serde_json::to_string_pretty(self),
            JsonFormat::Compact => serde_json::to_string(self),
        };
        result.map_err(|e| Error::Serialize(e.to_string()))
    }
}
