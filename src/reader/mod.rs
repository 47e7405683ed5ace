//! Data reader module
//!
//! The producer-side contract the page handler pulls events from, plus an
//! in-memory implementation backed by append-only partition logs.

mod memory;

pub use memory::MemoryReader;

use crate::error::Result;
use crate::protocol::{Event, HeaderSelection, PageBudget, LAST_CURSOR};
use crate::types::PartitionId;
use async_trait::async_trait;

/// Events read from one partition plus the position after them
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadBatch {
    /// Events in partition order
    pub events: Vec<Event>,
    /// Cursor addressing the first event not in `events`
    pub next_cursor: String,
}

impl ReadBatch {
    /// Create a batch
    pub fn new(events: Vec<Event>, next_cursor: impl Into<String>) -> Self {
        Self {
            events,
            next_cursor: next_cursor.into(),
        }
    }

    /// A batch with no events that ends the partition
    pub fn exhausted() -> Self {
        Self::new(Vec::new(), LAST_CURSOR)
    }

    /// Check if the reader reported the end of the partition
    pub fn is_last(&self) -> bool {
        self.next_cursor == LAST_CURSOR
    }
}

/// Source of events for one or more partitions.
///
/// `read` may be called repeatedly for the same page; each call starts at the
/// cursor returned by the previous one. Returning `LAST_CURSOR` as the next
/// cursor tells the caller no event will ever follow.
#[async_trait]
pub trait DataReader: Send + Sync {
    /// Read a bounded run of events starting at `cursor`
    async fn read(
        &self,
        partition: PartitionId,
        cursor: &str,
        headers: &HeaderSelection,
        budget: &PageBudget,
    ) -> Result<ReadBatch>;
}
