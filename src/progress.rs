//! Terminal progress rendering for enrichment runs.
//!
//! Row failures are logged by the pipeline; the bar only counts them.
use crate::pipeline::RowReport;
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::Cell;

const TEMPLATE: &str = "{spinner} [{elapsed_precise}] {bar:30} {pos}/{len} ({percent}%) {msg}";

/// Stderr progress bar fed by pipeline row reports.
pub struct ProgressReporter {
    bar: ProgressBar,
    failed: Cell<usize>,
}

impl ProgressReporter {
    /// A visible bar, or a hidden one when output is machine-readable.
    pub fn new(total: usize, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };
        bar.set_length(total as u64);
        if let Ok(style) = ProgressStyle::with_template(TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        Self {
            bar,
            failed: Cell::new(0),
        }
    }

    pub fn on_row(&self, report: &RowReport<'_>) {
        self.bar.set_position(report.progress.processed as u64);
        if report.failure.is_some() {
            self.failed.set(self.failed.get() + 1);
        }
        let message = match self.failed.get() {
            0 => report.display_name.to_string(),
            failed => format!("{} ({failed} failed)", report.display_name),
        };
        self.bar.set_message(message);
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}
