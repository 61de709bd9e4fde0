//! Per-job progress display
//!
//! Renders one progress bar per job, advanced as segment fetch tasks
//! terminate. The bar is suppressed in quiet mode and when stdout is not a
//! terminal, falling back to the structured log output.

use indicatif::{ProgressBar, ProgressStyle};

use crate::app::models::{JobOutcome, SegmentResult};
use crate::app::sequencer::JobMonitor;

/// Progress bar implementation of [`JobMonitor`]
#[derive(Debug)]
pub struct ProgressDisplay {
    enabled: bool,
    bar: Option<ProgressBar>,
}

impl ProgressDisplay {
    /// Create a display; disabled when quiet or not attached to a terminal
    pub fn new(quiet: bool) -> Self {
        Self {
            enabled: !quiet && atty::is(atty::Stream::Stdout),
            bar: None,
        }
    }

    /// Whether bars will actually be drawn
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} segments ({elapsed})")
            .expect("static progress template is valid")
            .progress_chars("=> ")
    }
}

impl JobMonitor for ProgressDisplay {
    fn job_started(&mut self, job_id: &str, total_segments: usize) {
        if !self.enabled {
            return;
        }

        let bar = ProgressBar::new(total_segments as u64);
        bar.set_style(Self::style());
        bar.set_prefix(job_id.to_string());
        self.bar = Some(bar);
    }

    fn segment_finished(&mut self, _result: &SegmentResult) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn job_finished(&mut self, outcome: &JobOutcome) {
        if let Some(bar) = self.bar.take() {
            if outcome.is_success() {
                bar.finish_with_message("done");
            } else {
                bar.abandon_with_message(format!(
                    "failed at {}",
                    outcome
                        .failed_at
                        .map(|stage| stage.to_string())
                        .unwrap_or_else(|| "unknown".to_string())
                ));
            }
        }
    }
}
