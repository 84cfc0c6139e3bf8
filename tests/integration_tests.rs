// Integration tests: HTTP read API over the shared history

mod common;

use axum_test::TestServer;
use common::used_mb_snapshot;
use statkeeper::history::{History, HistoryWriter, shared};
use statkeeper::models::Snapshot;
use statkeeper::routes;
use std::num::NonZeroUsize;

fn test_server() -> (TestServer, HistoryWriter) {
    let (writer, history) = shared(History::new(NonZeroUsize::new(5).unwrap()));
    let server = TestServer::try_new(routes::app(history)).unwrap();
    (server, writer)
}

#[tokio::test]
async fn test_version_endpoint() {
    let (server, _writer) = test_server();
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(
        json.get("name").and_then(|v| v.as_str()),
        Some("statkeeper")
    );
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_history_endpoint_empty() {
    let (server, _writer) = test_server();
    let response = server.get("/api/history").await;
    response.assert_status_ok();
    let entries: Vec<Snapshot> = response.json();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_history_endpoint_oldest_first() {
    let (server, mut writer) = test_server();
    writer.set_live(used_mb_snapshot(1_000, 100)).unwrap();
    writer
        .finalize(used_mb_snapshot(2_000, 150), used_mb_snapshot(2_000, 200))
        .unwrap();

    let response = server.get("/api/history").await;
    response.assert_status_ok();
    let entries: Vec<Snapshot> = response.json();
    let used: Vec<Option<u64>> = entries.iter().map(|e| e.used_mb()).collect();
    assert_eq!(used, vec![Some(150), Some(200)]);
}

#[tokio::test]
async fn test_latest_endpoint() {
    let (server, mut writer) = test_server();
    server
        .get("/api/history/latest")
        .expect_failure()
        .await
        .assert_status_not_found();

    writer.set_live(used_mb_snapshot(1_000, 100)).unwrap();
    writer.set_live(used_mb_snapshot(2_000, 120)).unwrap();
    let response = server.get("/api/history/latest").await;
    response.assert_status_ok();
    let latest: Snapshot = response.json();
    assert_eq!(latest.used_mb(), Some(120));
    assert_eq!(latest.collected_at, 2_000);
}
