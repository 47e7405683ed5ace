//! In-memory partition logs

use super::{DataReader, ReadBatch};
use crate::decode::decode_line;
use crate::error::{Error, Result};
use crate::protocol::{Event, HeaderSelection, PageBudget, PageItem, FIRST_CURSOR, LAST_CURSOR};
use crate::types::{Headers, JsonValue, PartitionId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct Record {
    headers: Headers,
    data: JsonValue,
    size: usize,
}

#[derive(Debug, Default)]
struct PartitionLog {
    records: Vec<Record>,
    sealed: bool,
}

/// Data reader over append-only in-memory logs.
///
/// Cursor tokens are decimal offsets into a partition's log. Once a partition
/// is sealed, reading up to its end yields `LAST_CURSOR`.
#[derive(Debug, Default)]
pub struct MemoryReader {
    partitions: RwLock<BTreeMap<PartitionId, PartitionLog>>,
}

impl MemoryReader {
    /// Create an empty reader
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a reader holding the given events
    pub fn from_events(events: impl IntoIterator<Item = Event>) -> Self {
        let mut partitions: BTreeMap<PartitionId, PartitionLog> = BTreeMap::new();
        for event in events {
            partitions
                .entry(event.partition)
                .or_default()
                .records
                .push(Record::new(event.headers.unwrap_or_default(), event.data));
        }
        Self {
            partitions: RwLock::new(partitions),
        }
    }

    /// Load events from an NDJSON file, one event object per line
    pub async fn from_ndjson_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;

        let mut events = Vec::new();
        for (index, line) in content.lines().enumerate() {
            match decode_line(line) {
                Ok(Some(PageItem::Event(event))) => events.push(event),
                Ok(Some(PageItem::Checkpoint(_))) => {
                    return Err(Error::decode(format!(
                        "{}:{}: expected an event, found a checkpoint",
                        path.display(),
                        index + 1
                    )));
                }
                Ok(None) => {}
                Err(e) => {
                    return Err(Error::decode(format!(
                        "{}:{}: {e}",
                        path.display(),
                        index + 1
                    )));
                }
            }
        }

        debug!(path = %path.display(), events = events.len(), "Loaded events");
        Ok(Self::from_events(events))
    }

    /// Append an event to a partition, returning its offset
    pub async fn append(
        &self,
        partition: PartitionId,
        headers: Headers,
        data: impl Into<JsonValue>,
    ) -> Result<usize> {
        let mut partitions = self.partitions.write().await;
        let log = partitions.entry(partition).or_default();
        if log.sealed {
            return Err(Error::data_reader(partition, "partition is sealed"));
        }
        log.records.push(Record::new(headers, data.into()));
        Ok(log.records.len() - 1)
    }

    /// Mark a partition as complete
    pub async fn seal(&self, partition: PartitionId) {
        self.partitions
            .write()
            .await
            .entry(partition)
            .or_default()
            .sealed = true;
    }

    /// Mark every known partition as complete
    pub async fn seal_all(&self) {
        for log in self.partitions.write().await.values_mut() {
            log.sealed = true;
        }
    }

    /// Number of events stored for a partition
    pub async fn len(&self, partition: PartitionId) -> usize {
        self.partitions
            .read()
            .await
            .get(&partition)
            .map_or(0, |log| log.records.len())
    }

    /// Partitions holding at least one event or sealed explicitly
    pub async fn partitions(&self) -> Vec<PartitionId> {
        self.partitions.read().await.keys().copied().collect()
    }
}

impl Record {
    fn new(headers: Headers, data: JsonValue) -> Self {
        let size = data.to_string().len();
        Self {
            headers,
            data,
            size,
        }
    }
}

fn parse_offset(partition: PartitionId, cursor: &str, len: usize) -> Result<usize> {
    if cursor == FIRST_CURSOR {
        return Ok(0);
    }
    match cursor.parse::<usize>() {
        Ok(offset) if offset <= len => Ok(offset),
        _ => Err(Error::InvalidCursor {
            partition,
            cursor: cursor.to_string(),
        }),
    }
}

#[async_trait]
impl DataReader for MemoryReader {
    async fn read(
        &self,
        partition: PartitionId,
        cursor: &str,
        headers: &HeaderSelection,
        budget: &PageBudget,
    ) -> Result<ReadBatch> {
        if cursor == LAST_CURSOR {
            return Ok(ReadBatch::exhausted());
        }

        let partitions = self.partitions.read().await;
        let (records, sealed) = partitions
            .get(&partition)
            .map_or((&[][..], false), |log| (log.records.as_slice(), log.sealed));

        let start = parse_offset(partition, cursor, records.len())?;
        let max_events = budget.max_events.unwrap_or(usize::MAX);

        let mut events = Vec::new();
        let mut bytes = 0usize;
        for record in &records[start..] {
            if events.len() >= max_events {
                break;
            }
            if let Some(max_bytes) = budget.max_bytes {
                if !events.is_empty() && bytes + record.size > max_bytes {
                    break;
                }
            }
            bytes += record.size;
            events.push(Event::new(
                partition,
                headers.project(&record.headers),
                record.data.clone(),
            ));
        }

        let end = start + events.len();
        let next_cursor = if sealed && end == records.len() {
            LAST_CURSOR.to_string()
        } else {
            end.to_string()
        };

        debug!(
            partition,
            cursor,
            events = events.len(),
            next_cursor = %next_cursor,
            "Read partition"
        );

        Ok(ReadBatch::new(events, next_cursor))
    }
}
