//! Finalized output parts.

use std::ops::Range;

/// One finalized output document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// 1-based sequence number, contiguous across a run
    pub sequence: u32,
    /// Zero-based page indices of the source covered by this part
    pub pages: Range<usize>,
    /// Serialized document bytes
    pub content: Vec<u8>,
}

impl Part {
    /// Create a new part.
    pub fn new(sequence: u32, pages: Range<usize>, content: Vec<u8>) -> Self {
        Self {
            sequence,
            pages,
            content,
        }
    }

    /// Number of source pages in this part.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Serialized size in bytes.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// Zero-based index of the first page.
    pub fn first_page(&self) -> usize {
        self.pages.start
    }

    /// Zero-based index of the last page.
    pub fn last_page(&self) -> usize {
        self.pages.end.saturating_sub(1)
    }
}
