//! Tests for the page handler

use super::*;
use crate::protocol::{Event, FIRST_CURSOR, LAST_CURSOR};
use crate::reader::{MemoryReader, ReadBatch};
use crate::types::Headers;
use async_trait::async_trait;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::Mutex;
use test_case::test_case;

async fn memory_reader(partitions: &[(PartitionId, usize)]) -> Arc<MemoryReader> {
    let reader = MemoryReader::new();
    for (partition, count) in partitions {
        for i in 0..*count {
            reader
                .append(*partition, Headers::new(), format!("p{partition}-e{i}"))
                .await
                .unwrap();
        }
    }
    Arc::new(reader)
}

async fn collect(stream: PageStream) -> Vec<Result<PageItem>> {
    stream.collect().await
}

fn items_ok(items: Vec<Result<PageItem>>) -> Vec<PageItem> {
    items.into_iter().map(|i| i.unwrap()).collect()
}

fn ev(partition: PartitionId, data: &str) -> PageItem {
    PageItem::Event(Event::new(partition, None, data))
}

fn cp(partition: PartitionId, token: &str) -> PageItem {
    PageItem::Checkpoint(Cursor::new(partition, token))
}

/// Reader that fails every call
struct FailingReader;

#[async_trait]
impl DataReader for FailingReader {
    async fn read(
        &self,
        partition: PartitionId,
        _cursor: &str,
        _headers: &HeaderSelection,
        _budget: &PageBudget,
    ) -> Result<ReadBatch> {
        Err(Error::data_reader(partition, "storage offline"))
    }
}

/// Reader replaying a fixed list of batches, then reporting its last position
struct ScriptedReader {
    batches: Mutex<VecDeque<ReadBatch>>,
    last: Mutex<String>,
}

impl ScriptedReader {
    fn new(batches: Vec<ReadBatch>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            last: Mutex::new(FIRST_CURSOR.to_string()),
        }
    }
}

#[async_trait]
impl DataReader for ScriptedReader {
    async fn read(
        &self,
        _partition: PartitionId,
        _cursor: &str,
        _headers: &HeaderSelection,
        _budget: &PageBudget,
    ) -> Result<ReadBatch> {
        let next = self.batches.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        Ok(match next {
            Some(batch) => {
                last.clone_from(&batch.next_cursor);
                batch
            }
            None => ReadBatch::new(Vec::new(), last.clone()),
        })
    }
}

/// Reader that never answers
struct StalledReader;

#[async_trait]
impl DataReader for StalledReader {
    async fn read(
        &self,
        _partition: PartitionId,
        _cursor: &str,
        _headers: &HeaderSelection,
        _budget: &PageBudget,
    ) -> Result<ReadBatch> {
        futures::future::pending().await
    }
}

// ============================================================================
// Validation Tests
// ============================================================================

#[tokio::test]
async fn test_partition_count_mismatch() {
    let handler = PageHandler::new(HandlerConfig::new(2))
        .with_shared_reader(memory_reader(&[]).await);

    let err = handler
        .handle(&PageRequest::new(3, vec![Cursor::first(0)]))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        Error::PartitionCountMismatch {
            expected: 2,
            actual: 3
        }
    ));
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_no_cursors() {
    let handler = PageHandler::new(HandlerConfig::new(2))
        .with_shared_reader(memory_reader(&[]).await);

    let err = handler.handle(&PageRequest::new(2, vec![])).err().unwrap();
    assert!(matches!(err, Error::CursorsMissing { ref partitions } if partitions.is_empty()));
}

#[tokio::test]
async fn test_unknown_partition() {
    let handler =
        PageHandler::new(HandlerConfig::new(2)).with_reader(0, memory_reader(&[]).await);

    let err = handler
        .handle(&PageRequest::new(2, vec![Cursor::first(1)]))
        .err()
        .unwrap();
    assert!(matches!(err, Error::UnknownPartition { partition: 1 }));
}

#[tokio::test]
async fn test_required_partition_without_cursor() {
    let config = HandlerConfig::new(3).with_required_partitions(vec![0, 2]);
    let handler = PageHandler::new(config).with_shared_reader(memory_reader(&[(0, 1)]).await);

    let err = handler
        .handle(&PageRequest::new(3, vec![Cursor::first(0), Cursor::first(1)]))
        .err()
        .unwrap();
    assert!(matches!(err, Error::CursorsMissing { ref partitions } if partitions == &vec![2]));
    assert_eq!(err.to_string(), "cursors are missing for partitions 2");
}

#[tokio::test]
async fn test_duplicate_cursor() {
    let handler = PageHandler::new(HandlerConfig::new(1))
        .with_shared_reader(memory_reader(&[]).await);

    let err = handler
        .handle(&PageRequest::new(1, vec![Cursor::first(0), Cursor::new(0, "3")]))
        .err()
        .unwrap();
    assert!(matches!(err, Error::InvalidParameter { ref name } if name == "cursor0"));
}

// ============================================================================
// Page Assembly Tests
// ============================================================================

#[tokio::test]
async fn test_sequential_page_keeps_partition_blocks() {
    let handler = PageHandler::new(HandlerConfig::new(2))
        .with_shared_reader(memory_reader(&[(0, 2), (1, 1)]).await);

    let request = PageRequest::new(2, vec![Cursor::first(0), Cursor::first(1)]);
    let items = items_ok(collect(handler.handle(&request).unwrap()).await);

    assert_eq!(
        items,
        vec![
            ev(0, "p0-e0"),
            ev(0, "p0-e1"),
            cp(0, "2"),
            ev(1, "p1-e0"),
            cp(1, "1"),
        ]
    );
}

#[tokio::test]
async fn test_page_size_hint_bounds_each_partition() {
    let handler = PageHandler::new(HandlerConfig::new(1))
        .with_shared_reader(memory_reader(&[(0, 5)]).await);

    let request = PageRequest::new(1, vec![Cursor::new(0, "1")]).with_page_size_hint(Some(2));
    let items = items_ok(collect(handler.handle(&request).unwrap()).await);

    assert_eq!(items, vec![ev(0, "p0-e1"), ev(0, "p0-e2"), cp(0, "3")]);
}

fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_handle_query_applies_page_size_hint() {
    let handler = PageHandler::new(HandlerConfig::new(1))
        .with_shared_reader(memory_reader(&[(0, 5)]).await);

    let stream = handler
        .handle_query(&query(&[("n", "1"), ("cursor0", "3"), ("pagesizehint", "1")]))
        .unwrap();
    let items = items_ok(collect(stream).await);

    assert_eq!(items, vec![ev(0, "p0-e3"), cp(0, "4")]);
}

#[tokio::test]
async fn test_handle_query_checks_hint_after_cursors() {
    let handler = PageHandler::new(HandlerConfig::new(2))
        .with_shared_reader(memory_reader(&[(0, 1)]).await);

    let err = handler
        .handle_query(&query(&[("n", "3"), ("cursor0", "c0"), ("pagesizehint", "x")]))
        .err()
        .unwrap();
    assert!(matches!(err, Error::PartitionCountMismatch { expected: 2, actual: 3 }));

    let err = handler
        .handle_query(&query(&[("n", "2"), ("pagesizehint", "x")]))
        .err()
        .unwrap();
    assert!(matches!(err, Error::CursorsMissing { ref partitions } if partitions.is_empty()));

    let err = handler
        .handle_query(&query(&[("n", "2"), ("cursor0", "0"), ("pagesizehint", "x")]))
        .err()
        .unwrap();
    assert!(matches!(err, Error::InvalidParameter { ref name } if name == "pagesizehint"));
}

#[tokio::test]
async fn test_multiple_reads_emit_a_checkpoint_each() {
    let reader = ScriptedReader::new(vec![
        ReadBatch::new(vec![Event::new(0, None, "a")], "c1"),
        ReadBatch::new(vec![Event::new(0, None, "b")], "c2"),
        ReadBatch::new(vec![Event::new(0, None, "c")], "c3"),
    ]);
    let config = HandlerConfig::new(1).with_max_reads_per_partition(5);
    let handler = PageHandler::new(config).with_reader(0, Arc::new(reader));

    let request = PageRequest::new(1, vec![Cursor::first(0)]);
    let items = items_ok(collect(handler.handle(&request).unwrap()).await);

    // the fourth read finds the script empty and reports the last position
    assert_eq!(
        items,
        vec![
            ev(0, "a"),
            cp(0, "c1"),
            ev(0, "b"),
            cp(0, "c2"),
            ev(0, "c"),
            cp(0, "c3"),
            cp(0, "c3"),
        ]
    );
}

#[tokio::test]
async fn test_read_limit_caps_reader_calls() {
    let reader = ScriptedReader::new(vec![
        ReadBatch::new(vec![Event::new(0, None, "a")], "c1"),
        ReadBatch::new(vec![Event::new(0, None, "b")], "c2"),
        ReadBatch::new(vec![Event::new(0, None, "c")], "c3"),
    ]);
    let config = HandlerConfig::new(1).with_max_reads_per_partition(2);
    let handler = PageHandler::new(config).with_reader(0, Arc::new(reader));

    let request = PageRequest::new(1, vec![Cursor::first(0)]);
    let items = items_ok(collect(handler.handle(&request).unwrap()).await);

    assert_eq!(items.last(), Some(&cp(0, "c2")));
    assert_eq!(items.len(), 4);
}

#[tokio::test]
async fn test_event_budget_stops_further_reads() {
    let reader = ScriptedReader::new(vec![
        ReadBatch::new(vec![Event::new(0, None, "a"), Event::new(0, None, "b")], "c1"),
        ReadBatch::new(vec![Event::new(0, None, "c")], "c2"),
    ]);
    let config = HandlerConfig::new(1)
        .with_default_page_size(2)
        .with_max_reads_per_partition(5);
    let handler = PageHandler::new(config).with_reader(0, Arc::new(reader));

    let request = PageRequest::new(1, vec![Cursor::first(0)]);
    let items = items_ok(collect(handler.handle(&request).unwrap()).await);

    assert_eq!(items, vec![ev(0, "a"), ev(0, "b"), cp(0, "c1")]);
}

#[tokio::test]
async fn test_reading_stops_at_last_cursor() {
    let reader = memory_reader(&[(0, 1)]).await;
    reader.seal(0).await;
    let config = HandlerConfig::new(1).with_max_reads_per_partition(10);
    let handler = PageHandler::new(config).with_shared_reader(reader);

    let items = items_ok(
        collect(
            handler
                .handle(&PageRequest::new(1, vec![Cursor::first(0)]))
                .unwrap(),
        )
        .await,
    );
    assert_eq!(items, vec![ev(0, "p0-e0"), cp(0, LAST_CURSOR)]);

    let items = items_ok(
        collect(
            handler
                .handle(&PageRequest::new(1, vec![Cursor::last(0)]))
                .unwrap(),
        )
        .await,
    );
    assert_eq!(items, vec![cp(0, LAST_CURSOR)]);
}

#[tokio::test]
async fn test_reading_stops_when_partition_is_idle() {
    let config = HandlerConfig::new(1).with_max_reads_per_partition(10);
    let handler = PageHandler::new(config).with_shared_reader(memory_reader(&[(0, 1)]).await);

    let items = items_ok(
        collect(
            handler
                .handle(&PageRequest::new(1, vec![Cursor::first(0)]))
                .unwrap(),
        )
        .await,
    );

    // second read finds nothing and still reports its position
    assert_eq!(items, vec![ev(0, "p0-e0"), cp(0, "1"), cp(0, "1")]);
}

#[tokio::test]
async fn test_header_selection_reaches_reader() {
    let reader = MemoryReader::new();
    let headers: Headers = [("h1".to_string(), "v1".to_string())].into_iter().collect();
    reader.append(0, headers.clone(), "e").await.unwrap();
    let handler = PageHandler::new(HandlerConfig::new(1)).with_shared_reader(Arc::new(reader));

    let request = PageRequest::new(1, vec![Cursor::new(0, FIRST_CURSOR)])
        .with_headers(HeaderSelection::All);
    let items = items_ok(collect(handler.handle(&request).unwrap()).await);

    assert_eq!(items[0], PageItem::Event(Event::new(0, Some(headers), "e")));
}

// ============================================================================
// Failure Tests
// ============================================================================

#[tokio::test]
async fn test_reader_failure_ends_the_stream() {
    let handler = PageHandler::new(HandlerConfig::new(3))
        .with_reader(0, memory_reader(&[(0, 1)]).await)
        .with_reader(1, Arc::new(FailingReader))
        .with_reader(2, memory_reader(&[(2, 1)]).await);

    let request = PageRequest::new(
        3,
        vec![Cursor::first(0), Cursor::first(1), Cursor::first(2)],
    );
    let items = collect(handler.handle(&request).unwrap()).await;

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_ref().unwrap(), &ev(0, "p0-e0"));
    assert_eq!(items[1].as_ref().unwrap(), &cp(0, "1"));
    assert!(matches!(
        items[2],
        Err(Error::DataReader { partition: 1, .. })
    ));
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[tokio::test]
async fn test_concurrent_mode_preserves_partition_order() {
    let config = HandlerConfig::new(2).with_concurrent(true);
    let handler =
        PageHandler::new(config).with_shared_reader(memory_reader(&[(0, 3), (1, 3)]).await);

    let request = PageRequest::new(2, vec![Cursor::first(0), Cursor::first(1)]);
    let items = items_ok(collect(handler.handle(&request).unwrap()).await);

    assert_eq!(items.len(), 8);
    for partition in [0, 1] {
        let own: Vec<&PageItem> = items.iter().filter(|i| i.partition() == partition).collect();
        assert_eq!(
            own,
            vec![
                &ev(partition, &format!("p{partition}-e0")),
                &ev(partition, &format!("p{partition}-e1")),
                &ev(partition, &format!("p{partition}-e2")),
                &cp(partition, "3"),
            ]
        );
    }
}

#[tokio::test]
async fn test_concurrent_mode_does_not_wait_for_slow_partition() {
    let config = HandlerConfig::new(2).with_concurrent(true);
    let handler = PageHandler::new(config)
        .with_reader(0, Arc::new(StalledReader))
        .with_reader(1, memory_reader(&[(1, 1)]).await);

    let request = PageRequest::new(2, vec![Cursor::first(0), Cursor::first(1)]);
    let mut stream = handler.handle(&request).unwrap();

    let first = tokio::time::timeout(std::time::Duration::from_secs(1), stream.next())
        .await
        .unwrap();
    assert_eq!(first.unwrap().unwrap(), ev(1, "p1-e0"));
}

// ============================================================================
// Budget Tests
// ============================================================================

#[test_case(None, Some(100) ; "default page size")]
#[test_case(Some(0), Some(100) ; "zero hint is ignored")]
#[test_case(Some(10), Some(10) ; "hint under the maximum")]
#[test_case(Some(5000), Some(1000) ; "hint clamped to the maximum")]
fn test_page_budget(hint: Option<usize>, expected: Option<usize>) {
    let budget = HandlerConfig::default().page_budget(hint);
    assert_eq!(budget.max_events, expected);
    assert_eq!(budget.max_bytes, None);
}

#[test]
fn test_unbounded_default_page_size() {
    let config = HandlerConfig::default().with_default_page_size(0);
    assert_eq!(config.page_budget(None), PageBudget::unbounded());
}
