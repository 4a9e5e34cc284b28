//! Integration tests for single transfers against a mock HTTP server.

use std::time::Duration;

use batchget_core::{
    DownloadManager, HttpClient, StartOptions, TransferKind, TransferStatus, WorkItem,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create a mock server with a file endpoint.
async fn setup_mock_file(path_str: &str, content: &[u8]) -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(path_str))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(&mock_server)
        .await;

    mock_server
}

/// Runs a single item through a fresh manager and returns its snapshot
/// after the batch finishes.
async fn run_single(item: WorkItem, pool_size: usize) -> batchget_core::StatusSnapshot {
    let manager = DownloadManager::new(pool_size).expect("valid pool size");
    manager.enqueue([item]);
    manager
        .start(StartOptions::default())
        .await
        .expect("dispatch task must not panic");
    manager.snapshot()
}

#[tokio::test]
async fn test_download_preserves_content() {
    let content = b"This is the complete file content for testing.\nLine 2.\nLine 3.";
    let server = setup_mock_file("/document.pdf", content).await;
    let tmp = TempDir::new().expect("temp dir");

    let url = format!("{}/document.pdf", server.uri());
    let item = WorkItem::new(&url, "document.pdf", tmp.path(), TransferKind::Http);
    let snapshot = run_single(item, 1).await;

    assert_eq!(snapshot.completed.len(), 1, "one completed result");
    let record = &snapshot.completed[0];
    assert_eq!(record.status, TransferStatus::Completed);
    assert_eq!(record.size_bytes, content.len() as u64);

    let downloaded = std::fs::read(tmp.path().join("document.pdf")).expect("file exists");
    assert_eq!(downloaded, content, "content must match");
}

#[tokio::test]
async fn test_download_existing_file_makes_no_http_call() {
    let server = MockServer::start().await;

    // Any request at all fails the test on server verification.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let tmp = TempDir::new().expect("temp dir");
    std::fs::write(tmp.path().join("present.bin"), b"pre-existing bytes").expect("seed file");

    let url = format!("{}/present.bin", server.uri());
    let item = WorkItem::new(&url, "present.bin", tmp.path(), TransferKind::Http);
    let snapshot = run_single(item, 1).await;

    assert_eq!(snapshot.completed.len(), 1);
    let record = &snapshot.completed[0];
    assert_eq!(record.status, TransferStatus::Exists);
    assert_eq!(record.size_bytes, 18);

    // Zero byte writes: the seeded content is untouched.
    let content = std::fs::read(tmp.path().join("present.bin")).expect("file still there");
    assert_eq!(content, b"pre-existing bytes");
}

#[tokio::test]
async fn test_download_404_fails_with_distinct_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let tmp = TempDir::new().expect("temp dir");
    let url = format!("{}/missing.pdf", server.uri());
    let item = WorkItem::new(&url, "missing.pdf", tmp.path(), TransferKind::Http);
    let snapshot = run_single(item, 1).await;

    assert_eq!(snapshot.failed.len(), 1);
    let message = snapshot.failed[0].error.as_deref().expect("error message");
    assert!(
        message.contains("not found"),
        "404 must map to a distinct message, got: {message}"
    );
    assert!(
        !tmp.path().join("missing.pdf").exists(),
        "no partial file may remain"
    );
}

#[tokio::test]
async fn test_download_403_fails_with_distinct_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private.zip"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let tmp = TempDir::new().expect("temp dir");
    let url = format!("{}/private.zip", server.uri());
    let item = WorkItem::new(&url, "private.zip", tmp.path(), TransferKind::Http);
    let snapshot = run_single(item, 1).await;

    assert_eq!(snapshot.failed.len(), 1);
    let message = snapshot.failed[0].error.as_deref().expect("error message");
    assert!(
        message.contains("access denied"),
        "403 must map to a distinct message, got: {message}"
    );
}

#[tokio::test]
async fn test_download_server_error_passes_status_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky.bin"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let tmp = TempDir::new().expect("temp dir");
    let url = format!("{}/flaky.bin", server.uri());
    let item = WorkItem::new(&url, "flaky.bin", tmp.path(), TransferKind::Http);
    let snapshot = run_single(item, 1).await;

    assert_eq!(snapshot.failed.len(), 1);
    let message = snapshot.failed[0].error.as_deref().expect("error message");
    assert!(message.contains("503"), "status must appear, got: {message}");
}

#[tokio::test]
async fn test_download_failure_does_not_stop_siblings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/good.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"good".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bad.bin"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let tmp = TempDir::new().expect("temp dir");
    let manager = DownloadManager::new(2).expect("valid pool size");
    manager.enqueue([
        WorkItem::new(
            format!("{}/bad.bin", server.uri()),
            "bad.bin",
            tmp.path(),
            TransferKind::Http,
        ),
        WorkItem::new(
            format!("{}/good.bin", server.uri()),
            "good.bin",
            tmp.path(),
            TransferKind::Http,
        ),
    ]);
    manager
        .start(StartOptions::default())
        .await
        .expect("dispatch task must not panic");

    let snapshot = manager.snapshot();
    assert_eq!(snapshot.completed.len(), 1, "good URL completes");
    assert_eq!(snapshot.failed.len(), 1, "bad URL fails in isolation");
    assert!(tmp.path().join("good.bin").exists());
}

#[tokio::test]
async fn test_download_reports_progress_totals() {
    // 64 KiB body delayed long enough for at least one snapshot mid-flight.
    let body = vec![0xAB_u8; 64 * 1024];
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body.clone())
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let tmp = TempDir::new().expect("temp dir");
    let manager = DownloadManager::with_client(1, HttpClient::new()).expect("valid pool size");
    manager.enqueue([WorkItem::new(
        format!("{}/large.bin", server.uri()),
        "large.bin",
        tmp.path(),
        TransferKind::Http,
    )]);
    let handle = manager.start(StartOptions::default());

    // While in flight, the active record is visible with the URL as key.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let mid_flight = manager.snapshot();
    assert!(
        mid_flight.active.len() <= 1,
        "at most one active record per URL"
    );

    handle.await.expect("dispatch task must not panic");
    let done = manager.snapshot();
    assert_eq!(done.completed.len(), 1);
    assert_eq!(done.completed[0].size_bytes, 64 * 1024);
    assert!(done.active.is_empty(), "record removed at terminal state");
}
