//! Document access and part building.
//!
//! The partitioner never computes sizes itself. Serialized size is not
//! additive across pages (shared fonts and images, container overhead), so
//! a candidate part has to be materialized and measured after every page.
//! That measurement sits behind [`PartBuilder::measure`], keeping the
//! partitioning loop independent of the document format.

mod pdf;
mod scratch;

pub use pdf::{PdfPage, PdfPartBuilder, PdfSource};

use crate::error::Result;

/// Read-only access to an ordered sequence of pages.
pub trait PageSource {
    /// Opaque page handle.
    type Page: Clone;

    /// Builder that accumulates pages of this source.
    type Builder: PartBuilder<Page = Self::Page>;

    /// Human-readable identity used in logs and error context.
    fn name(&self) -> &str;

    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Page at a zero-based index.
    ///
    /// Fails with [`Error::PageOutOfRange`](crate::Error::PageOutOfRange)
    /// outside `0..page_count()`.
    fn page_at(&self, index: usize) -> Result<Self::Page>;

    /// Start an empty part.
    fn new_builder(&self) -> Result<Self::Builder>;
}

/// An ordered, growing set of pages that can be serialized on demand.
pub trait PartBuilder {
    /// Page handle accepted by this builder.
    type Page;

    /// Append a page after the ones already held. Does not serialize.
    fn append(&mut self, page: Self::Page);

    /// Serialize the current page sequence and return its length in bytes.
    ///
    /// Must return the same value for the same page sequence.
    fn measure(&mut self) -> Result<u64>;

    /// Number of pages held.
    fn page_count(&self) -> usize;

    /// Serialize the final byte stream, consuming the builder.
    ///
    /// Scratch storage held by the builder is released on return, whether
    /// serialization succeeded or not.
    fn finalize(self) -> Result<Vec<u8>>;
}
