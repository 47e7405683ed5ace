//! Integration tests against a live feed server
//!
//! Tests the full end-to-end flow: MemoryReader → PageHandler → axum → Client → SyncEngine → cursor file

use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::tempdir;
use zeroeventhub::cli::router;
use zeroeventhub::{
    Client, Cursor, CursorStore, Error, Event, HandlerConfig, HeaderSelection, Headers,
    MemoryReader, PageHandler, PageReceiver, SyncConfig, SyncEngine, LAST_CURSOR,
};

/// Serve `handler` on an ephemeral port, returning the feed URL
async fn spawn_feed(handler: PageHandler) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(Arc::new(handler), "/feed/v1");
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/feed/v1")
}

async fn reader_with(events: &[(u32, &str)]) -> Arc<MemoryReader> {
    let reader = Arc::new(MemoryReader::new());
    for (partition, data) in events {
        reader
            .append(*partition, Headers::new(), *data)
            .await
            .unwrap();
    }
    reader
}

fn stop_when_idle() -> SyncConfig {
    SyncConfig::new().with_max_idle_pages(1)
}

// ============================================================================
// Sync Tests
// ============================================================================

#[tokio::test]
async fn test_follow_sealed_feed_to_the_end() {
    let reader = reader_with(&[(0, "e0"), (1, "e1"), (0, "e2"), (1, "e3"), (0, "e4")]).await;
    reader.seal_all().await;
    let handler = PageHandler::new(HandlerConfig::new(2).with_default_page_size(2))
        .with_shared_reader(reader);
    let url = spawn_feed(handler).await;

    let dir = tempdir().unwrap();
    let state_path = dir.path().join("cursors.json");
    let client = Client::new(&url, 2).unwrap();
    let mut engine = SyncEngine::new(client, CursorStore::new(&state_path));

    let mut seen = Vec::new();
    let stats = engine
        .run(|page| {
            seen.extend(page.events.iter().map(|e| e.data.clone()));
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(seen, vec!["e0", "e2", "e1", "e3", "e4"]);
    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.partitions_exhausted, 2);

    let persisted = CursorStore::from_file(&state_path).unwrap();
    assert_eq!(persisted.cursor(0).await, LAST_CURSOR);
    assert_eq!(persisted.cursor(1).await, LAST_CURSOR);
}

#[tokio::test]
async fn test_resume_from_persisted_cursors() {
    let reader = reader_with(&[(0, "a"), (0, "b")]).await;
    let handler =
        PageHandler::new(HandlerConfig::new(1)).with_shared_reader(reader.clone());
    let url = spawn_feed(handler).await;

    let dir = tempdir().unwrap();
    let state_path = dir.path().join("cursors.json");

    let mut first = SyncEngine::new(Client::new(&url, 1).unwrap(), CursorStore::new(&state_path))
        .with_config(stop_when_idle());
    let stats = first.run(|_| Ok(())).await.unwrap();
    assert_eq!(stats.events_received, 2);
    assert_eq!(stats.idle_pages, 1);

    reader.append(0, Headers::new(), "c").await.unwrap();

    let store = CursorStore::from_file(&state_path).unwrap();
    assert_eq!(store.cursor(0).await, "2");

    let mut second =
        SyncEngine::new(Client::new(&url, 1).unwrap(), store).with_config(stop_when_idle());
    let mut seen = Vec::new();
    second
        .run(|page| {
            seen.extend(page.events.iter().map(|e| e.data.clone()));
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(seen, vec!["c"]);
    assert_eq!(second.store().cursor(0).await, "3");
}

#[tokio::test]
async fn test_missing_required_cursor_over_http() {
    let reader = reader_with(&[(0, "a"), (1, "b")]).await;
    let handler = PageHandler::new(HandlerConfig::new(2).with_required_partitions(vec![1]))
        .with_shared_reader(reader);
    let url = spawn_feed(handler).await;

    let store = CursorStore::in_memory();
    let mut engine = SyncEngine::new(Client::new(&url, 2).unwrap(), store.clone())
        .with_config(SyncConfig::new().with_partitions(vec![0]));

    let err = engine.run(|_| Ok(())).await.unwrap_err();

    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("cursors are missing for partitions 1"));
        }
        other => panic!("Expected HttpStatus, got {other:?}"),
    }
    assert!(store.snapshot().await.cursors.is_empty());
}

// ============================================================================
// Client Tests
// ============================================================================

#[tokio::test]
async fn test_partition_count_mismatch() {
    let handler = PageHandler::new(HandlerConfig::new(2)).with_shared_reader(reader_with(&[]).await);
    let url = spawn_feed(handler).await;

    let client = Client::new(&url, 3).unwrap();
    let mut page = PageReceiver::new();
    let err = client
        .fetch_events(&[Cursor::first(0)], None, &mut page, &HeaderSelection::None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 400, .. }));
    assert!(err
        .to_string()
        .contains("Partition count doesn't match as expected"));
    assert!(page.is_empty());
}

#[tokio::test]
async fn test_header_selection_round_trip() {
    let reader = Arc::new(MemoryReader::new());
    let headers: Headers = [("h1", "v1"), ("h2", "v2")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    reader.append(0, headers, "payload").await.unwrap();
    let handler = PageHandler::new(HandlerConfig::new(1)).with_shared_reader(reader);
    let url = spawn_feed(handler).await;

    let client = Client::new(&url, 1).unwrap();
    let mut page = PageReceiver::new();
    client
        .fetch_events(
            &[Cursor::first(0)],
            Some(10),
            &mut page,
            &HeaderSelection::named(["h1"]),
        )
        .await
        .unwrap();

    let expected: Headers = [("h1".to_string(), "v1".to_string())].into_iter().collect();
    assert_eq!(
        page.events(),
        &[Event::new(0, Some(expected), "payload")]
    );
    assert_eq!(page.latest_checkpoints(), &[Cursor::new(0, "1")]);
}
