//! # pdfsplit
//!
//! Split PDF documents into parts that each stay under a size ceiling,
//! such as an e-mail attachment limit.
//!
//! Pages keep their order and content; concatenating the parts in sequence
//! order gives back every page of the source exactly once.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfsplit::{split_file, SplitOptions};
//!
//! fn main() -> pdfsplit::Result<()> {
//!     let options = SplitOptions::new().with_threshold(9 * 1024 * 1024);
//!     let report = split_file("scan.pdf", "out", options)?;
//!     for part in &report.parts {
//!         println!("part {}: pages {}-{}", part.sequence, part.first_page, part.last_page);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## How sizes are measured
//!
//! The size a page adds to a PDF depends on what else is in the file:
//! shared fonts and images are stored once, and the container has fixed
//! overhead. The splitter therefore serializes the candidate part after
//! every page and compares the real byte count against the threshold.
//! The threshold triggers rotation once reached; with the default
//! [`OverflowPolicy::Lenient`] the page that crosses it stays in the part
//! being closed, so parts can end slightly above the threshold. Use
//! [`OverflowPolicy::Strict`] to keep every multi-page part below it.
//!
//! A single page larger than the threshold still becomes a part of its own.

pub mod detect;
pub mod error;
pub mod options;
pub mod partition;
pub mod report;
pub mod sink;
pub mod source;

// Re-export commonly used types
pub use detect::{
    detect_format_from_bytes, detect_format_from_path, is_pdf, is_pdf_bytes, PdfFormat,
};
pub use error::{Error, ErrorKind, Result};
pub use options::{
    parse_byte_size, CancelFlag, MeasureMode, OverflowPolicy, PublishMode, SplitOptions,
    DEFAULT_THRESHOLD,
};
pub use partition::{NoProgress, Part, PartitionRun, PartitionState, Partitioner, Progress};
pub use report::{JsonFormat, PartSummary, SplitReport};
pub use sink::{part_file_name, DirectorySink, PartSink, WrittenPart};
pub use source::{PageSource, PartBuilder, PdfSource};

use std::path::{Path, PathBuf};

/// Split a PDF file into parts written to `output_dir`.
///
/// Parts are named `{stem}_part_{n}.{ext}` after the input file.
///
/// # Example
///
/// ```no_run
/// use pdfsplit::{split_file, SplitOptions};
///
/// let report = split_file("scan.pdf", "out", SplitOptions::default()).unwrap();
/// println!("{} parts", report.part_count());
/// ```
pub fn split_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output_dir: Q,
    options: SplitOptions,
) -> Result<SplitReport> {
    Splitter::new()
        .input(input.as_ref())
        .output_dir(output_dir.as_ref())
        .options(options)
        .run()
}

/// Split an in-memory PDF and return the parts.
///
/// # Example
///
/// ```no_run
/// use pdfsplit::{split_bytes, SplitOptions};
///
/// let data = std::fs::read("scan.pdf").unwrap();
/// let parts = split_bytes(&data, &SplitOptions::new().with_threshold(1 << 20)).unwrap();
/// for part in parts {
///     std::fs::write(format!("scan_part_{}.pdf", part.sequence), &part.content).unwrap();
/// }
/// ```
pub fn split_bytes(data: &[u8], options: &SplitOptions) -> Result<Vec<Part>> {
    options.validate()?;
    let source =
        PdfSource::from_bytes(data, "<memory>")?.with_measure_mode(options.measure.clone());
    let mut parts = Vec::new();
    Partitioner::new(&source, options).run(&mut parts, &mut NoProgress)?;
    Ok(parts)
}

/// Builder for one split job.
///
/// Input and output are explicit settings of the job; nothing is read from
/// process-wide state.
///
/// # Example
///
/// ```no_run
/// use pdfsplit::Splitter;
///
/// let report = Splitter::new()
///     .input("scan.pdf")
///     .output_dir("out")
///     .with_threshold(5 * 1024 * 1024)
///     .strict()
///     .atomic()
///     .run_with_progress(&mut |done: usize, total: usize| {
///         eprintln!("{}/{}", done, total);
///     })?;
/// # Ok::<(), pdfsplit::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Splitter {
    input: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    options: SplitOptions,
}

impl Splitter {
    /// Create a new job with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the input document.
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = Some(path.into());
        self
    }

    /// Set the directory parts are written into.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Replace all split options.
    pub fn options(mut self, options: SplitOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the size threshold in bytes.
    pub fn with_threshold(mut self, bytes: u64) -> Self {
        self.options = self.options.with_threshold(bytes);
        self
    }

    /// Move overflowing pages to the next part.
    pub fn strict(mut self) -> Self {
        self.options = self.options.strict();
        self
    }

    /// Publish all parts at once, or none on failure.
    pub fn atomic(mut self) -> Self {
        self.options = self.options.atomic();
        self
    }

    /// Current options.
    pub fn split_options(&self) -> &SplitOptions {
        &self.options
    }

    /// Run the job.
    pub fn run(self) -> Result<SplitReport> {
        self.run_with_progress(&mut NoProgress)
    }

    /// Run the job, reporting each processed page to `progress`.
    pub fn run_with_progress<P>(self, progress: &mut P) -> Result<SplitReport>
    where
        P: Progress + ?Sized,
    {
        let input = self
            .input
            .ok_or_else(|| Error::Config("no input document selected".to_string()))?;
        let output_dir = self
            .output_dir
            .ok_or_else(|| Error::Config("no output directory selected".to_string()))?;
        self.options.validate()?;

        log::info!(
            "Splitting {} into {} (threshold {} bytes, {:?})",
            input.display(),
            output_dir.display(),
            self.options.threshold,
            self.options.overflow
        );

        let source = PdfSource::open(&input)?.with_measure_mode(self.options.measure.clone());
        let mut sink =
            DirectorySink::for_input(&output_dir, &input).with_mode(self.options.publish);

        let mut report = Partitioner::new(&source, &self.options).run(&mut sink, progress)?;
        report.source = Some(input);
        report.attach_paths(sink.written());
        Ok(report)
    }
}
