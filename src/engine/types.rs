//! Engine types
//!
//! Loop state, configuration and statistics for the sync engine.

use crate::protocol::{Cursor, HeaderSelection};
use crate::types::{BackoffType, PartitionId};
use std::time::Duration;

/// Where the pagination loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Cursor table loaded, nothing requested yet
    Idle,
    /// Building or sending the next request
    Requesting,
    /// Streaming a response into the page receiver
    Ingesting,
    /// Every requested partition reached `LAST_CURSOR`
    Done,
}

/// Result of one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageOutcome {
    /// Events the page carried
    pub events: usize,
    /// Checkpoints applied to the table
    pub advanced: Vec<Cursor>,
    /// Partitions whose cursor differs from the one requested
    pub moved: usize,
    /// Partitions that reached `LAST_CURSOR` with this page
    pub exhausted: Vec<PartitionId>,
    /// Whether nothing is left to request
    pub done: bool,
}

impl PageOutcome {
    /// Outcome of a poll made after the engine finished
    pub fn finished() -> Self {
        Self {
            done: true,
            ..Self::default()
        }
    }

    /// Check if the page carried no events and moved no cursor
    pub fn is_idle(&self) -> bool {
        self.events == 0 && self.moved == 0
    }
}

/// Configuration for sync operation
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Partitions to follow (None = every partition of the feed)
    pub partitions: Option<Vec<PartitionId>>,
    /// Headers to request with each event
    pub headers: HeaderSelection,
    /// Page size hint sent with each request
    pub page_size_hint: Option<usize>,
    /// Backoff strategy after a page without events
    pub backoff_type: BackoffType,
    /// Initial idle delay
    pub initial_backoff: Duration,
    /// Maximum idle delay
    pub max_backoff: Duration,
    /// Stop after this many consecutive idle pages (None = never)
    pub max_idle_pages: Option<usize>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            partitions: None,
            headers: HeaderSelection::None,
            page_size_hint: None,
            backoff_type: BackoffType::Exponential,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            max_idle_pages: None,
        }
    }
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow only these partitions
    #[must_use]
    pub fn with_partitions(mut self, partitions: Vec<PartitionId>) -> Self {
        self.partitions = Some(partitions);
        self
    }

    /// Set the header selection
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderSelection) -> Self {
        self.headers = headers;
        self
    }

    /// Set the page size hint
    #[must_use]
    pub fn with_page_size_hint(mut self, hint: usize) -> Self {
        self.page_size_hint = Some(hint);
        self
    }

    /// Set idle backoff
    #[must_use]
    pub fn with_backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.backoff_type = backoff_type;
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Stop after `pages` consecutive idle pages
    #[must_use]
    pub fn with_max_idle_pages(mut self, pages: usize) -> Self {
        self.max_idle_pages = Some(pages);
        self
    }

    /// Delay before the next request after `idle_pages` idle pages in a row
    pub fn idle_delay(&self, idle_pages: u32) -> Duration {
        self.backoff_type.delay(
            idle_pages.saturating_sub(1),
            self.initial_backoff,
            self.max_backoff,
        )
    }
}

/// Statistics from a sync operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Total events received
    pub events_received: usize,
    /// Total checkpoints received
    pub checkpoints_received: usize,
    /// Pages handed to the consumer
    pub pages_fetched: usize,
    /// Pages that carried no events and moved no cursor
    pub idle_pages: usize,
    /// Partitions that reached `LAST_CURSOR`
    pub partitions_exhausted: usize,
    /// Failed page attempts
    pub errors: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handled page
    pub fn add_page(&mut self, events: usize, checkpoints: usize, idle: bool) {
        self.pages_fetched += 1;
        self.events_received += events;
        self.checkpoints_received += checkpoints;
        if idle {
            self.idle_pages += 1;
        }
    }

    /// Add exhausted partitions
    pub fn add_exhausted(&mut self, count: usize) {
        self.partitions_exhausted += count;
    }

    /// Add an error
    pub fn add_error(&mut self) {
        self.errors += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
