use comfydash_core::{Category, ProgressReporter};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// CLI progress reporter using indicatif progress bars.
///
/// One bar per category, created the first time the category is reported.
/// Bars draw to stderr and stay hidden when it is not a terminal.
pub struct CliReporter {
    multi: MultiProgress,
    bars: Mutex<BTreeMap<Category, ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: Mutex::new(BTreeMap::new()),
        }
    }

    fn new_bar(&self, category: Category, total: usize) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new(total as u64));
        pb.set_style(
            ProgressStyle::with_template(
                "{prefix:>10} [{bar:30.cyan/dim}] {pos}/{len} files ({eta} remaining)",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─"),
        );
        pb.set_prefix(category.to_string());
        pb
    }
}

impl ProgressReporter for CliReporter {
    fn on_category_progress(&self, category: Category, done: usize, total: usize) {
        let Ok(mut bars) = self.bars.lock() else {
            return;
        };
        let pb = bars
            .entry(category)
            .or_insert_with(|| self.new_bar(category, total));
        pb.set_position(done as u64);
        if done >= total {
            pb.finish();
        }
    }

    fn on_scan_complete(&self, _cataloged: usize, _skipped: usize) {
        let Ok(bars) = self.bars.lock() else {
            return;
        };
        // Cancelled scans leave bars short of their totals.
        for pb in bars.values().filter(|pb| !pb.is_finished()) {
            pb.abandon();
        }
    }
}
