//! Handler configuration

use crate::protocol::PageBudget;
use crate::types::PartitionId;
use serde::{Deserialize, Serialize};

/// Configuration of a page handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Number of partitions the feed has
    pub partition_count: usize,
    /// Partitions every request must carry a cursor for
    pub required_partitions: Vec<PartitionId>,
    /// Events per partition when the client sends no hint (0 = unbounded)
    pub default_page_size: usize,
    /// Upper bound applied to the client's page size hint
    pub max_page_size: usize,
    /// Payload byte budget per partition
    pub max_bytes: Option<usize>,
    /// Pull partitions concurrently instead of one after another
    pub concurrent: bool,
    /// Reader calls allowed per partition within one page
    pub max_reads_per_partition: usize,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            partition_count: 1,
            required_partitions: Vec::new(),
            default_page_size: 100,
            max_page_size: 1000,
            max_bytes: None,
            concurrent: false,
            max_reads_per_partition: 1,
        }
    }
}

impl HandlerConfig {
    /// Create a config for a feed with `partition_count` partitions
    pub fn new(partition_count: usize) -> Self {
        Self {
            partition_count,
            ..Self::default()
        }
    }

    /// Require a cursor for these partitions
    #[must_use]
    pub fn with_required_partitions(mut self, partitions: Vec<PartitionId>) -> Self {
        self.required_partitions = partitions;
        self
    }

    /// Set the default page size
    #[must_use]
    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    /// Set the maximum page size
    #[must_use]
    pub fn with_max_page_size(mut self, size: usize) -> Self {
        self.max_page_size = size;
        self
    }

    /// Set the byte budget per partition
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    /// Pull partitions concurrently
    #[must_use]
    pub fn with_concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Set the reader call limit per partition
    #[must_use]
    pub fn with_max_reads_per_partition(mut self, reads: usize) -> Self {
        self.max_reads_per_partition = reads.max(1);
        self
    }

    /// Budget one partition gets for a page
    pub fn page_budget(&self, page_size_hint: Option<usize>) -> PageBudget {
        let size = match page_size_hint.filter(|h| *h > 0) {
            Some(hint) if self.max_page_size > 0 => hint.min(self.max_page_size),
            Some(hint) => hint,
            None => self.default_page_size,
        };
        PageBudget {
            max_events: (size > 0).then_some(size),
            max_bytes: self.max_bytes,
        }
    }
}
