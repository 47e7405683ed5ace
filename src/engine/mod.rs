//! Execution engine module
//!
//! Client-side pagination loop.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncEngine` - requests pages, hands them to the consumer and advances
//!   the cursor table
//! - `SyncConfig` - partitions, header selection, page size hint, idle backoff
//! - `EngineState` / `PageOutcome` / `SyncStats`
//!
//! The cursor table only moves after the consumer accepted a page, and then
//! for all of the page's partitions at once. A failed request, a malformed
//! response or a failing consumer leave it untouched.

mod types;

pub use types::{EngineState, PageOutcome, SyncConfig, SyncStats};

use crate::client::PageSource;
use crate::error::{Error, Result};
use crate::protocol::{Cursor, PageRequest};
use crate::receiver::{Page, PageReceiver};
use crate::state::CursorStore;
use crate::types::PartitionId;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Sync engine following a feed page after page
pub struct SyncEngine<S> {
    /// Where pages come from
    source: S,
    /// Cursor table
    store: CursorStore,
    /// Sync configuration
    config: SyncConfig,
    /// Statistics
    stats: SyncStats,
    /// Loop state
    state: EngineState,
    /// Partitions not yet exhausted
    active: Vec<PartitionId>,
}

impl<S: PageSource> SyncEngine<S> {
    /// Create a new sync engine
    pub fn new(source: S, store: CursorStore) -> Self {
        Self {
            source,
            store,
            config: SyncConfig::default(),
            stats: SyncStats::default(),
            state: EngineState::Idle,
            active: Vec::new(),
        }
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the cursor store
    pub fn store(&self) -> &CursorStore {
        &self.store
    }

    /// Get the page source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Current loop state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Partitions still being followed
    pub fn active_partitions(&self) -> &[PartitionId] {
        &self.active
    }

    async fn activate(&mut self) -> Result<()> {
        let partition_count = self.source.partition_count();
        let partitions = match &self.config.partitions {
            Some(partitions) => {
                if let Some(p) = partitions.iter().find(|p| **p as usize >= partition_count) {
                    return Err(Error::config(format!(
                        "partition {p} out of range for a feed of {partition_count} partitions"
                    )));
                }
                partitions.clone()
            }
            None => (0..partition_count)
                .map(|p| {
                    PartitionId::try_from(p)
                        .map_err(|_| Error::config(format!("partition {p} out of range")))
                })
                .collect::<Result<Vec<_>>>()?,
        };

        let table = self.store.snapshot().await;
        self.active = partitions
            .into_iter()
            .filter(|p| !table.is_exhausted(*p))
            .collect();

        self.state = if self.active.is_empty() {
            EngineState::Done
        } else {
            EngineState::Requesting
        };
        debug!(partitions = ?self.active, "Engine activated");
        Ok(())
    }

    /// Fetch one page, hand it to `on_page` and advance the cursor table.
    ///
    /// On any error the cursor table is left as it was before the call.
    pub async fn poll_page<F>(&mut self, on_page: F) -> Result<PageOutcome>
    where
        F: FnOnce(&Page) -> Result<()>,
    {
        if self.state == EngineState::Idle {
            self.activate().await?;
        }
        if self.state == EngineState::Done {
            return Ok(PageOutcome::finished());
        }

        self.state = EngineState::Requesting;
        let cursors = self.store.cursors_for(&self.active).await;
        let request = PageRequest::new(self.source.partition_count(), cursors)
            .with_headers(self.config.headers.clone())
            .with_page_size_hint(self.config.page_size_hint);

        self.state = EngineState::Ingesting;
        let mut receiver = PageReceiver::new();
        let fetched = self.source.fetch_page(&request, &mut receiver).await;
        self.state = EngineState::Requesting;
        if let Err(e) = fetched {
            self.stats.add_error();
            warn!(error = %e, "Page request failed");
            return Err(e);
        }

        let page = receiver.into_page();
        if let Err(e) = on_page(&page) {
            self.stats.add_error();
            warn!(error = %e, "Consumer rejected page");
            return Err(e);
        }

        let advanced: Vec<Cursor> = page
            .latest_checkpoints
            .iter()
            .filter(|c| self.active.contains(&c.partition))
            .cloned()
            .collect();
        if advanced.len() < page.latest_checkpoints.len() {
            warn!("Ignoring checkpoints for partitions that were not requested");
        }

        let moved = advanced
            .iter()
            .filter(|c| request.cursor_for(c.partition) != Some(*c))
            .count();

        self.store.apply_checkpoints(&advanced).await?;

        let exhausted: Vec<PartitionId> = advanced
            .iter()
            .filter(|c| c.is_last())
            .map(|c| c.partition)
            .collect();
        self.active.retain(|p| !exhausted.contains(p));

        let outcome = PageOutcome {
            events: page.events.len(),
            advanced,
            moved,
            exhausted,
            done: self.active.is_empty(),
        };
        self.stats
            .add_page(outcome.events, page.checkpoints.len(), outcome.is_idle());
        self.stats.add_exhausted(outcome.exhausted.len());

        if outcome.done {
            self.state = EngineState::Done;
        }

        info!(
            events = outcome.events,
            advanced = outcome.advanced.len(),
            moved = outcome.moved,
            exhausted = outcome.exhausted.len(),
            "Page handled"
        );

        Ok(outcome)
    }

    /// Poll pages until every partition is exhausted.
    ///
    /// Idle pages (no events, no cursor moved) back off per the configured
    /// policy; with `max_idle_pages` set the loop also stops after that many
    /// idle pages in a row. Errors end the loop without retrying.
    pub async fn run<F>(&mut self, mut on_page: F) -> Result<SyncStats>
    where
        F: FnMut(&Page) -> Result<()>,
    {
        let start = Instant::now();
        let mut idle_pages: u32 = 0;

        let result = loop {
            let outcome = match self.poll_page(&mut on_page).await {
                Ok(outcome) => outcome,
                Err(e) => break Err(e),
            };
            if outcome.done {
                break Ok(());
            }

            if !outcome.is_idle() {
                idle_pages = 0;
                continue;
            }

            idle_pages = idle_pages.saturating_add(1);
            if self
                .config
                .max_idle_pages
                .is_some_and(|max| idle_pages as usize >= max)
            {
                debug!(idle_pages, "Stopping after idle pages");
                break Ok(());
            }

            let delay = self.config.idle_delay(idle_pages);
            debug!(?delay, "Idle page, backing off");
            tokio::time::sleep(delay).await;
        };

        self.stats.set_duration(start.elapsed().as_millis() as u64);
        result.map(|()| self.stats.clone())
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.stats = SyncStats::default();
    }
}
