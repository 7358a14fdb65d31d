//! Progress UI (bar) for asset downloads.

use std::sync::Arc;

use bundler_core::{DownloadError, DownloadObserver, DownloadTask};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Drives an indicatif bar from download callbacks.
pub(crate) struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    fn new(bar: ProgressBar) -> Self {
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    /// Clears the bar once the run is over.
    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl DownloadObserver for ProgressReporter {
    fn batch_started(&self, total: usize) {
        self.bar.set_length(u64::try_from(total).unwrap_or(u64::MAX));
        self.bar.set_position(0);
        self.bar.set_message("Downloading assets...");
    }

    fn task_started(&self, task: &DownloadTask) {
        self.bar.set_message(format!("Downloading {}...", task.label()));
    }

    fn task_finished(&self, task: &DownloadTask, outcome: &Result<u64, DownloadError>) {
        if outcome.is_err() {
            self.bar.println(format!("  failed: {}", task.label()));
        }
        self.bar.inc(1);
    }
}

/// Returns a reporter when progress output is wanted.
pub(crate) fn create_progress_reporter(show_progress: bool) -> Option<Arc<ProgressReporter>> {
    show_progress.then(|| {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        Arc::new(ProgressReporter::new(bar))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_create_progress_reporter_disabled_returns_none() {
        assert!(create_progress_reporter(false).is_none());
    }

    #[test]
    fn test_reporter_counts_finished_tasks() {
        let reporter = ProgressReporter::new(ProgressBar::hidden());
        let task = DownloadTask::logo("https://x/logo.png", PathBuf::from("logo.png"));

        reporter.batch_started(2);
        reporter.task_started(&task);
        reporter.task_finished(&task, &Ok(10));
        reporter.task_finished(&task, &Err(DownloadError::timeout("https://x/logo.png")));

        assert_eq!(reporter.bar.length(), Some(2));
        assert_eq!(reporter.bar.position(), 2);
        reporter.finish();
    }
}
