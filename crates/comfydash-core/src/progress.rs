//! Scan progress reporting.

use crate::catalog::Category;

/// Receives per-category progress while a scan runs.
///
/// The CLI implements this with indicatif bars; embedders may forward it to
/// their own clients. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// `done` of the `total` files discovered for `category` are processed.
    ///
    /// Every category is reported once with `done == 0` after the walk,
    /// including categories with no files.
    fn on_category_progress(&self, _category: Category, _done: usize, _total: usize) {}

    /// File processing has stopped, either complete or cancelled.
    fn on_scan_complete(&self, _cataloged: usize, _skipped: usize) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
