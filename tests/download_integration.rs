//! Integration tests for the download module.
//!
//! These tests verify batch downloads against mock HTTP servers.

mod support;
use support::socket_guard::start_mock_server_or_skip;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bundler_core::RecordId;
use bundler_core::download::{
    AssetDownloader, DownloadError, DownloadObserver, DownloadTask, HttpClient,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[derive(Default)]
struct CountingObserver {
    total: AtomicUsize,
    started: AtomicUsize,
    finished: AtomicUsize,
}

impl DownloadObserver for CountingObserver {
    fn batch_started(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
    }

    fn task_started(&self, _task: &DownloadTask) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn task_finished(&self, _task: &DownloadTask, _outcome: &Result<u64, DownloadError>) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

fn downloader(concurrency: usize) -> AssetDownloader {
    let client = HttpClient::with_timeouts(Duration::from_secs(5), Duration::from_secs(5))
        .expect("client should build");
    AssetDownloader::new(client, concurrency).expect("valid concurrency")
}

#[tokio::test]
async fn test_batch_results_keep_input_order() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/slow.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"slow".to_vec())
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fast.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fast!".to_vec()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let tasks = vec![
        DownloadTask::question_image(
            format!("{}/slow.png", server.uri()),
            dir.path().join("Images/q1_slow.png"),
            RecordId::Number(1),
        ),
        DownloadTask::question_image(
            format!("{}/fast.png", server.uri()),
            dir.path().join("Images/q2_fast.png"),
            RecordId::Number(2),
        ),
        DownloadTask::logo(
            format!("{}/missing.png", server.uri()),
            dir.path().join("Logo/logo.png"),
        ),
    ];

    let results = downloader(3)
        .download_all(tasks, &CancellationToken::new())
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].outcome.as_ref().ok(), Some(&4));
    assert_eq!(results[1].outcome.as_ref().ok(), Some(&5));
    assert!(matches!(
        results[2].outcome,
        Err(DownloadError::HttpStatus { status: 404, .. })
    ));
    assert_eq!(std::fs::read(dir.path().join("Images/q1_slow.png")).unwrap(), b"slow");
    assert!(!dir.path().join("Logo/logo.png").exists());
}

#[tokio::test]
async fn test_observer_sees_every_started_task() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"img".to_vec()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let tasks: Vec<_> = (0..5)
        .map(|index| {
            DownloadTask::answer_image(
                format!("{}/a{index}.png", server.uri()),
                dir.path().join(format!("a{index}.png")),
                RecordId::Number(1),
                index,
            )
        })
        .collect();
    let observer = Arc::new(CountingObserver::default());

    let results = downloader(2)
        .with_observer(observer.clone())
        .download_all(tasks, &CancellationToken::new())
        .await;

    assert!(results.iter().all(|result| result.ok()));
    assert_eq!(observer.total.load(Ordering::SeqCst), 5);
    assert_eq!(observer.started.load(Ordering::SeqCst), 5);
    assert_eq!(observer.finished.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_cancelled_batch_marks_unstarted_tasks() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let dir = TempDir::new().unwrap();
    let tasks = vec![DownloadTask::logo(
        format!("{}/logo.png", server.uri()),
        dir.path().join("logo.png"),
    )];
    let cancel = CancellationToken::new();
    cancel.cancel();

    let results = downloader(1).download_all(tasks, &cancel).await;

    assert!(matches!(
        results[0].outcome,
        Err(DownloadError::Cancelled { .. })
    ));
    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_slow_transfer_times_out_and_leaves_no_file() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/stall.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"late".to_vec())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = HttpClient::with_timeouts(Duration::from_secs(1), Duration::from_millis(200))
        .expect("client should build");
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("stall.png");

    let result = client
        .download_to_path(&format!("{}/stall.png", server.uri()), &dest)
        .await;

    assert!(matches!(result, Err(DownloadError::Timeout { .. })));
    assert!(!dest.exists());
}
