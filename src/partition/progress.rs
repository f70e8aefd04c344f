//! Per-page progress notification.

/// Receives one notification per processed page.
///
/// `processed` runs from 1 to `total` in steps of exactly one, however many
/// parts those pages end up in.
pub trait Progress {
    /// Called after a page has been processed.
    fn advance(&mut self, processed: usize, total: usize);
}

impl<F> Progress for F
where
    F: FnMut(usize, usize),
{
    fn advance(&mut self, processed: usize, total: usize) {
        self(processed, total)
    }
}

/// Progress sink that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn advance(&mut self, _processed: usize, _total: usize) {}
}
