//! Size-bounded partitioning.
//!
//! Pages are fed one at a time into the current [`PartBuilder`], which is
//! re-measured after each addition. Once the measured size reaches the
//! threshold the part is closed and a new one is started. This is a greedy
//! pass: parts are never rebalanced after the fact.
//!
//! # Example
//!
//! ```no_run
//! use pdfsplit::partition::{NoProgress, Partitioner};
//! use pdfsplit::{Part, PdfSource, SplitOptions};
//!
//! fn main() -> pdfsplit::Result<()> {
//!     let source = PdfSource::open("scan.pdf")?;
//!     let options = SplitOptions::new().with_threshold(5 * 1024 * 1024);
//!
//!     let mut parts: Vec<Part> = Vec::new();
//!     let report = Partitioner::new(&source, &options).run(&mut parts, &mut NoProgress)?;
//!     println!("{} parts", report.part_count());
//!     Ok(())
//! }
//! ```

mod part;
mod progress;

pub use part::Part;
pub use progress::{NoProgress, Progress};

use std::ops::Range;

use crate::error::{Error, Result};
use crate::options::{OverflowPolicy, SplitOptions};
use crate::report::SplitReport;
use crate::sink::PartSink;
use crate::source::{PageSource, PartBuilder};

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionState {
    /// Building the current part.
    Accumulating,
    /// A part has just been closed; the next page starts a new one.
    Rotating,
    /// Every page has been consumed and the trailing part emitted.
    Done,
}

/// Greedy size-bounded splitter over a [`PageSource`].
pub struct Partitioner<'a, S: PageSource> {
    source: &'a S,
    options: &'a SplitOptions,
}

impl<'a, S: PageSource> Partitioner<'a, S> {
    /// Create a partitioner for one source.
    pub fn new(source: &'a S, options: &'a SplitOptions) -> Self {
        Self { source, options }
    }

    /// Begin a step-by-step run.
    pub fn start(&self) -> Result<PartitionRun<'a, S>> {
        self.options.validate()?;
        Ok(PartitionRun {
            source: self.source,
            options: self.options,
            state: PartitionState::Accumulating,
            builder: None,
            start: 0,
            next: 0,
            sequence: 1,
            report: SplitReport::new(
                self.source.name(),
                self.source.page_count(),
                self.options.threshold,
                self.options.overflow,
            ),
        })
    }

    /// Partition every page, handing finalized parts to `sink` in order.
    ///
    /// On failure, parts already accepted by the sink stay with it.
    pub fn run<K, P>(&self, sink: &mut K, progress: &mut P) -> Result<SplitReport>
    where
        K: PartSink + ?Sized,
        P: Progress + ?Sized,
    {
        let mut run = self.start()?;
        while run.step(sink, progress)? != PartitionState::Done {}
        Ok(run.into_report())
    }
}

/// An in-progress partition of one source.
pub struct PartitionRun<'a, S: PageSource> {
    source: &'a S,
    options: &'a SplitOptions,
    state: PartitionState,
    builder: Option<S::Builder>,
    /// Index of the first page in `builder`
    start: usize,
    /// Index of the next page to process
    next: usize,
    /// Sequence number the current part will get
    sequence: u32,
    report: SplitReport,
}

impl<'a, S: PageSource> PartitionRun<'a, S> {
    /// Current state.
    pub fn state(&self) -> PartitionState {
        self.state
    }

    /// Number of pages processed so far.
    pub fn pages_processed(&self) -> usize {
        self.next
    }

    /// Process one page, or emit the trailing part once all pages are in.
    pub fn step<K, P>(&mut self, sink: &mut K, progress: &mut P) -> Result<PartitionState>
    where
        K: PartSink + ?Sized,
        P: Progress + ?Sized,
    {
        if self.state == PartitionState::Done {
            return Ok(PartitionState::Done);
        }

        let total = self.source.page_count();
        if self.next >= total {
            self.finish(sink)?;
            return Ok(self.state);
        }

        let index = self.next;
        if self.options.is_cancelled() {
            log::info!("{}: cancelled before page index {}", self.source.name(), index);
            return Err(Error::Cancelled { page: index });
        }

        self.process(index, sink).map_err(|e| self.with_context(index, e))?;
        self.next += 1;
        progress.advance(self.next, total);
        Ok(self.state)
    }

    /// The summary of parts emitted so far.
    pub fn report(&self) -> &SplitReport {
        &self.report
    }

    /// Consume the run and return its summary.
    pub fn into_report(self) -> SplitReport {
        self.report
    }

    fn process<K: PartSink + ?Sized>(&mut self, index: usize, sink: &mut K) -> Result<()> {
        let page = self.source.page_at(index)?;

        let mut builder = match self.builder.take() {
            Some(builder) => builder,
            None => {
                self.start = index;
                self.source.new_builder()?
            }
        };
        builder.append(page.clone());
        let size = builder.measure()?;
        log::debug!(
            "page index {}: part {} holds {} pages, {} bytes",
            index,
            self.sequence,
            builder.page_count(),
            size
        );

        if size < self.options.threshold {
            self.builder = Some(builder);
            self.state = PartitionState::Accumulating;
            return Ok(());
        }

        self.state = PartitionState::Rotating;
        let threshold = self.options.threshold;

        if builder.page_count() == 1 {
            self.warn_oversized(index, size);
            return self.emit(builder, index..index + 1, sink);
        }

        match self.options.overflow {
            OverflowPolicy::Lenient => self.emit(builder, self.start..index + 1, sink),
            OverflowPolicy::Strict => {
                drop(builder);

                let mut prior = self.source.new_builder()?;
                for i in self.start..index {
                    prior.append(self.source.page_at(i)?);
                }
                self.emit(prior, self.start..index, sink)?;

                let mut seeded = self.source.new_builder()?;
                seeded.append(page);
                self.start = index;
                let seeded_size = seeded.measure()?;
                if seeded_size >= threshold {
                    self.warn_oversized(index, seeded_size);
                    self.emit(seeded, index..index + 1, sink)
                } else {
                    self.builder = Some(seeded);
                    Ok(())
                }
            }
        }
    }

    fn finish<K: PartSink + ?Sized>(&mut self, sink: &mut K) -> Result<()> {
        if let Some(builder) = self.builder.take() {
            if builder.page_count() > 0 {
                let last = self.next.saturating_sub(1);
                self.emit(builder, self.start..self.next, sink)
                    .map_err(|e| self.with_context(last, e))?;
            }
        }
        sink.finish()?;
        self.state = PartitionState::Done;
        log::info!(
            "{}: {} pages split into {} parts",
            self.source.name(),
            self.report.page_count,
            self.report.part_count()
        );
        Ok(())
    }

    fn emit<K: PartSink + ?Sized>(
        &mut self,
        builder: S::Builder,
        pages: Range<usize>,
        sink: &mut K,
    ) -> Result<()> {
        let content = builder.finalize()?;
        let part = Part::new(self.sequence, pages, content);
        log::info!(
            "Part {} created: pages {}-{}, {:.2} MB",
            part.sequence,
            part.first_page() + 1,
            part.last_page() + 1,
            part.size() as f64 / (1024.0 * 1024.0)
        );
        self.report.record(&part);
        sink.accept(part)?;
        self.sequence += 1;
        Ok(())
    }

    fn warn_oversized(&self, index: usize, size: u64) {
        log::warn!(
            "{}: page index {} alone is {} bytes, over the {} byte threshold; emitting it as its own part",
            self.source.name(),
            index,
            size,
            self.options.threshold
        );
    }

    fn with_context(&self, page: usize, err: Error) -> Error {
        match err {
            Error::Cancelled { .. } | Error::AtPage { .. } => err,
            other => Error::AtPage {
                document: self.source.name().to_string(),
                page,
                source: Box::new(other),
            },
        }
    }
}
