//! Progress bar for the search and download phases.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use opinion_corpus::{ArtifactOutcome, ProgressObserver};

/// [`ProgressObserver`] that draws a single reusable bar on stderr.
pub(crate) struct ProgressDisplay {
    bar: ProgressBar,
}

impl ProgressDisplay {
    /// Creates a visible bar, or a hidden one when `enabled` is false.
    pub(crate) fn new(enabled: bool) -> Self {
        let bar = if enabled {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos}/{len}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressObserver for ProgressDisplay {
    fn search_progress(&self, found: usize, max: usize) {
        self.bar.set_message("Searching");
        self.bar.set_length(max as u64);
        self.bar.set_position(found as u64);
    }

    fn sync_started(&self, total: usize) {
        self.bar.set_message("Downloading");
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    fn artifact_finished(&self, opinion_id: u64, outcome: ArtifactOutcome) {
        if outcome == ArtifactOutcome::Failed {
            self.bar.set_message(format!("Downloading (failed {opinion_id})"));
        }
        self.bar.inc(1);
    }
}
