//! Cursor table persisted between runs
//!
//! Serialized to JSON; partition ids become object keys.

use crate::protocol::{Cursor, FIRST_CURSOR, LAST_CURSOR};
use crate::types::PartitionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current position of every partition a consumer has seen
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorTable {
    /// Partition -> cursor token
    #[serde(default)]
    pub cursors: BTreeMap<PartitionId, String>,

    /// When the table last advanced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CursorTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor of a partition, `FIRST_CURSOR` if never advanced
    pub fn cursor(&self, partition: PartitionId) -> &str {
        self.cursors
            .get(&partition)
            .map_or(FIRST_CURSOR, String::as_str)
    }

    /// Cursors of the given partitions
    pub fn cursors_for(&self, partitions: &[PartitionId]) -> Vec<Cursor> {
        partitions
            .iter()
            .map(|p| Cursor::new(*p, self.cursor(*p)))
            .collect()
    }

    /// Set the cursor of a partition
    pub fn set(&mut self, partition: PartitionId, token: impl Into<String>) {
        self.cursors.insert(partition, token.into());
    }

    /// Check if a partition reached `LAST_CURSOR`
    pub fn is_exhausted(&self, partition: PartitionId) -> bool {
        self.cursor(partition) == LAST_CURSOR
    }
}
