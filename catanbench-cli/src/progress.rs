//! Terminal progress bar for long runs

use catanbench_harness::{Milestone, ProgressObserver};
use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "[{elapsed_precise}] [{bar:40}] {pos}/{len} matches ({eta})";

/// Progress observer that drives an indicatif bar instead of log lines
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(0))
    }

    fn with_bar(bar: ProgressBar) -> Self {
        let style = ProgressStyle::default_bar()
            .template(TEMPLATE)
            .map(|s| s.progress_chars("=> "))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self { bar }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for BarProgress {
    fn started(&mut self, total: u64) {
        self.bar.set_length(total);
    }

    fn advanced(&mut self, completed: u64, _total: u64) {
        self.bar.set_position(completed);
    }

    fn milestone(&mut self, milestone: Milestone) {
        tracing::debug!("Progress: {}/{}", milestone.completed, milestone.total);
    }

    fn finished(&mut self) {
        self.bar.finish_with_message("done");
    }
}
