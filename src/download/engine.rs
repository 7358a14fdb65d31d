//! Bounded-parallel asset downloads.
//!
//! The [`AssetDownloader`] runs a batch of [`DownloadTask`]s under a semaphore.
//! Each task is independent: a failure is recorded in its [`TaskResult`] and
//! never stops the others. Results come back in enqueue order.
//!
//! # Example
//!
//! ```no_run
//! use bundler_core::download::{AssetDownloader, DownloadTask, HttpClient};
//! use std::path::PathBuf;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = AssetDownloader::new(HttpClient::new()?, 6)?;
//! let tasks = vec![DownloadTask::logo(
//!     "https://cdn.example.com/logo.png",
//!     PathBuf::from("./out/Logo/logo.png"),
//! )];
//! let results = downloader.download_all(tasks, &CancellationToken::new()).await;
//! println!("ok: {}", results.iter().filter(|r| r.ok()).count());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::task::{DownloadTask, TaskResult};
use super::{DownloadError, HttpClient};

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 16;

/// Default concurrency if not specified.
pub const DEFAULT_CONCURRENCY: usize = 6;

/// Error type for download engine construction.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Progress callbacks for a download batch.
///
/// Callbacks run on worker tasks and must not block.
pub trait DownloadObserver: Send + Sync {
    /// Called once before any task starts.
    fn batch_started(&self, _total: usize) {}

    /// Called when a task acquires a worker slot.
    fn task_started(&self, _task: &DownloadTask) {}

    /// Called when a started task completes, successfully or not.
    fn task_finished(&self, _task: &DownloadTask, _outcome: &Result<u64, DownloadError>) {}
}

enum Slot {
    Spawned(JoinHandle<Result<u64, DownloadError>>),
    Done(Result<u64, DownloadError>),
}

/// Runs asset downloads with a fixed worker cap.
///
/// # Concurrency Model
///
/// - Each download runs in its own Tokio task
/// - A semaphore permit is acquired before starting each download
/// - Permits are released automatically when downloads complete (RAII)
/// - Cancellation is checked while waiting for a permit and again when the
///   task starts; tasks already transferring run to completion
#[derive(Clone)]
pub struct AssetDownloader {
    client: HttpClient,
    semaphore: Arc<Semaphore>,
    concurrency: usize,
    observer: Option<Arc<dyn DownloadObserver>>,
}

impl std::fmt::Debug for AssetDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetDownloader")
            .field("client", &self.client)
            .field("concurrency", &self.concurrency)
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

impl AssetDownloader {
    /// Creates a downloader with the given worker cap.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-16).
    #[instrument(level = "debug", skip(client))]
    pub fn new(client: HttpClient, concurrency: usize) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }

        debug!(
            concurrency,
            timeout_ms = client.request_timeout().as_millis(),
            "creating asset downloader"
        );

        Ok(Self {
            client,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            observer: None,
        })
    }

    /// Attaches a progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn DownloadObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Downloads every task, returning one result per task in input order.
    ///
    /// Tasks not started when `cancel` fires are reported as
    /// [`DownloadError::Cancelled`].
    #[instrument(skip(self, tasks, cancel), fields(task_count = tasks.len()))]
    pub async fn download_all(
        &self,
        tasks: Vec<DownloadTask>,
        cancel: &CancellationToken,
    ) -> Vec<TaskResult> {
        if let Some(observer) = &self.observer {
            observer.batch_started(tasks.len());
        }
        info!(concurrency = self.concurrency, "starting asset downloads");

        let mut slots = Vec::with_capacity(tasks.len());
        for task in tasks {
            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                permit = Arc::clone(&self.semaphore).acquire_owned() => Some(permit),
            };

            let slot = match permit {
                None => Slot::Done(Err(DownloadError::cancelled(&task.url))),
                Some(Err(_)) => Slot::Done(Err(DownloadError::aborted(
                    &task.url,
                    "worker pool closed",
                ))),
                Some(Ok(permit)) => {
                    let client = self.client.clone();
                    let observer = self.observer.clone();
                    let cancel = cancel.clone();
                    let spawned = task.clone();
                    Slot::Spawned(tokio::spawn(async move {
                        // Permit is dropped when this block exits (RAII)
                        let _permit = permit;
                        if cancel.is_cancelled() {
                            return Err(DownloadError::cancelled(&spawned.url));
                        }
                        if let Some(observer) = &observer {
                            observer.task_started(&spawned);
                        }
                        let outcome = client
                            .download_to_path(&spawned.url, &spawned.dest_path)
                            .await;
                        if let Some(observer) = &observer {
                            observer.task_finished(&spawned, &outcome);
                        }
                        outcome
                    }))
                }
            };
            slots.push((task, slot));
        }

        debug!(task_count = slots.len(), "waiting for downloads to complete");

        let mut results = Vec::with_capacity(slots.len());
        for (task, slot) in slots {
            let outcome = match slot {
                Slot::Spawned(handle) => handle
                    .await
                    .unwrap_or_else(|e| Err(DownloadError::aborted(&task.url, e.to_string()))),
                Slot::Done(outcome) => outcome,
            };
            match &outcome {
                Ok(bytes) => {
                    debug!(task = %task.label(), bytes, path = %task.dest_path.display(), "download completed");
                }
                Err(error) => {
                    warn!(task = %task.label(), url = %task.url, error = %error, "download failed");
                }
            }
            results.push(TaskResult { task, outcome });
        }

        let succeeded = results.iter().filter(|result| result.ok()).count();
        info!(
            succeeded,
            failed = results.len() - succeeded,
            total = results.len(),
            "asset downloads complete"
        );
        results
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::remote::RecordId;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    #[derive(Default)]
    struct Recorder {
        total: Mutex<Option<usize>>,
        finished: Mutex<Vec<String>>,
    }

    impl DownloadObserver for Recorder {
        fn batch_started(&self, total: usize) {
            *self.total.lock().unwrap() = Some(total);
        }

        fn task_finished(&self, task: &DownloadTask, _outcome: &Result<u64, DownloadError>) {
            self.finished.lock().unwrap().push(task.url.clone());
        }
    }

    fn client() -> HttpClient {
        HttpClient::with_timeouts(Duration::from_secs(5), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_downloader_new_valid_concurrency() {
        assert_eq!(AssetDownloader::new(client(), 1).unwrap().concurrency(), 1);
        assert_eq!(AssetDownloader::new(client(), 6).unwrap().concurrency(), 6);
        assert_eq!(AssetDownloader::new(client(), 16).unwrap().concurrency(), 16);
    }

    #[test]
    fn test_downloader_new_invalid_concurrency() {
        assert!(matches!(
            AssetDownloader::new(client(), 0),
            Err(EngineError::InvalidConcurrency { value: 0 })
        ));
        assert!(matches!(
            AssetDownloader::new(client(), 17),
            Err(EngineError::InvalidConcurrency { value: 17 })
        ));
    }

    #[test]
    fn test_engine_error_display() {
        let msg = EngineError::InvalidConcurrency { value: 0 }.to_string();
        assert!(msg.contains("invalid concurrency"));
        assert!(msg.contains("16"));
    }

    #[test]
    fn test_default_concurrency_constant() {
        assert_eq!(DEFAULT_CONCURRENCY, 6);
    }

    #[test]
    fn test_download_all_empty_batch() {
        let downloader = AssetDownloader::new(client(), 2).unwrap();
        let results =
            tokio_test::block_on(downloader.download_all(Vec::new(), &CancellationToken::new()));
        assert!(results.is_empty());
    }

    #[test]
    fn test_download_all_cancelled_before_start_skips_every_task() {
        let downloader = AssetDownloader::new(client(), 2).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let tasks = vec![
            DownloadTask::logo("https://cdn.example.com/a.png", PathBuf::from("a.png")),
            DownloadTask::logo("https://cdn.example.com/b.png", PathBuf::from("b.png")),
        ];

        let results = tokio_test::block_on(downloader.download_all(tasks, &cancel));

        assert_eq!(results.len(), 2);
        assert!(
            results
                .iter()
                .all(|result| matches!(result.outcome, Err(DownloadError::Cancelled { .. })))
        );
    }

    #[tokio::test]
    async fn test_download_all_preserves_order_and_isolates_failures() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/slow.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"slow")
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fast.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fast"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let tasks: Vec<DownloadTask> = ["slow", "gone", "fast"]
            .iter()
            .enumerate()
            .map(|(index, name)| {
                DownloadTask::question_image(
                    format!("{}/{name}.png", mock_server.uri()),
                    temp_dir.path().join(format!("{name}.png")),
                    RecordId::Number(i64::try_from(index).unwrap()),
                )
            })
            .collect();

        let recorder = Arc::new(Recorder::default());
        let downloader = AssetDownloader::new(client(), 3)
            .unwrap()
            .with_observer(recorder.clone());
        let results = downloader
            .download_all(tasks, &CancellationToken::new())
            .await;

        let urls: Vec<&str> = results.iter().map(|r| r.task.url.as_str()).collect();
        assert!(urls[0].ends_with("/slow.png"));
        assert!(urls[1].ends_with("/gone.png"));
        assert!(urls[2].ends_with("/fast.png"));
        assert!(results[0].ok());
        assert!(!results[1].ok());
        assert!(results[1].reason().unwrap().contains("404"));
        assert!(results[2].ok());
        assert_eq!(
            std::fs::read(temp_dir.path().join("fast.png")).unwrap(),
            b"fast"
        );
        assert_eq!(*recorder.total.lock().unwrap(), Some(3));
        assert_eq!(recorder.finished.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_task_result_reason_for_invalid_url() {
        let result = TaskResult {
            task: DownloadTask::logo("nope", PathBuf::from("logo.png")),
            outcome: Err(DownloadError::invalid_url("nope")),
        };
        assert!(!result.ok());
        assert_eq!(result.reason().as_deref(), Some("invalid URL: nope"));
    }
}
