//! Page accumulator

use super::EventReceiver;
use crate::error::Result;
use crate::protocol::{Cursor, Event};
use crate::types::{Headers, JsonValue, PartitionId};
use async_trait::async_trait;
use std::collections::HashMap;

/// A completed page, owned by the consumer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Events in arrival order
    pub events: Vec<Event>,
    /// Every checkpoint in arrival order
    pub checkpoints: Vec<Cursor>,
    /// Last checkpoint per partition, ordered by first appearance
    pub latest_checkpoints: Vec<Cursor>,
}

impl Page {
    /// Check if the page carried nothing at all
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.checkpoints.is_empty()
    }

    /// Latest checkpoint of a partition
    pub fn latest_for(&self, partition: PartitionId) -> Option<&Cursor> {
        self.latest_checkpoints
            .iter()
            .find(|c| c.partition == partition)
    }
}

/// Receive a page of events.
///
/// Single owner for the lifetime of one page; call `clear` (or start a new
/// receiver) before the next page.
#[derive(Debug, Clone, Default)]
pub struct PageReceiver {
    events: Vec<Event>,
    checkpoints: Vec<Cursor>,
    latest: Vec<Cursor>,
    latest_index: HashMap<PartitionId, usize>,
}

impl PageReceiver {
    /// Create an empty receiver
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn event(&mut self, partition: PartitionId, headers: Option<Headers>, data: JsonValue) {
        self.events.push(Event::new(partition, headers, data));
    }

    /// Append a checkpoint and make it the partition's latest
    pub fn checkpoint(&mut self, partition: PartitionId, cursor: impl Into<String>) {
        let cursor = Cursor::new(partition, cursor);
        match self.latest_index.get(&partition) {
            Some(&index) => self.latest[index] = cursor.clone(),
            None => {
                self.latest_index.insert(partition, self.latest.len());
                self.latest.push(cursor.clone());
            }
        }
        self.checkpoints.push(cursor);
    }

    /// Drop everything received so far
    pub fn clear(&mut self) {
        self.events.clear();
        self.checkpoints.clear();
        self.latest.clear();
        self.latest_index.clear();
    }

    /// Events received, in order
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Checkpoints received, in order
    pub fn checkpoints(&self) -> &[Cursor] {
        &self.checkpoints
    }

    /// Only the latest checkpoint for each partition
    pub fn latest_checkpoints(&self) -> &[Cursor] {
        &self.latest
    }

    /// Check if nothing has been received
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.checkpoints.is_empty()
    }

    /// Consume the receiver into an owned page
    pub fn into_page(self) -> Page {
        Page {
            events: self.events,
            checkpoints: self.checkpoints,
            latest_checkpoints: self.latest,
        }
    }
}

#[async_trait]
impl EventReceiver for PageReceiver {
    async fn event(
        &mut self,
        partition: PartitionId,
        headers: Option<Headers>,
        data: JsonValue,
    ) -> Result<()> {
        PageReceiver::event(self, partition, headers, data);
        Ok(())
    }

    async fn checkpoint(&mut self, partition: PartitionId, cursor: String) -> Result<()> {
        PageReceiver::checkpoint(self, partition, cursor);
        Ok(())
    }
}
