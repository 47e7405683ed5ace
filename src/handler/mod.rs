//! Page handler module
//!
//! Producer-side orchestration of one page.
//!
//! # Overview
//!
//! The handler module provides:
//! - `PageHandler` - validates a page request and pulls events from the
//!   partition readers
//! - `HandlerConfig` - partition count, required partitions, page budgets
//! - `PageStream` - the ordered stream of events and checkpoints
//!
//! A request is validated completely before the stream is built, so a rejected
//! request never produces a partial page. Within a partition every read
//! yields its events followed by a checkpoint carrying the reader's new
//! position.

mod types;

pub use types::HandlerConfig;

use crate::error::{Error, Result};
use crate::protocol::{Cursor, HeaderSelection, PageBudget, PageItem, PageRequest};
use crate::reader::DataReader;
use crate::types::PartitionId;
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Ordered page items; ends after the first error
pub type PageStream = BoxStream<'static, Result<PageItem>>;

/// Serves pages from a set of partition readers
#[derive(Clone)]
pub struct PageHandler {
    config: HandlerConfig,
    readers: BTreeMap<PartitionId, Arc<dyn DataReader>>,
}

impl std::fmt::Debug for PageHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageHandler")
            .field("config", &self.config)
            .field("partitions", &self.readers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PageHandler {
    /// Create a handler with no readers
    pub fn new(config: HandlerConfig) -> Self {
        Self {
            config,
            readers: BTreeMap::new(),
        }
    }

    /// Serve one partition from a reader
    #[must_use]
    pub fn with_reader(mut self, partition: PartitionId, reader: Arc<dyn DataReader>) -> Self {
        self.readers.insert(partition, reader);
        self
    }

    /// Serve every configured partition from the same reader
    #[must_use]
    pub fn with_shared_reader(mut self, reader: Arc<dyn DataReader>) -> Self {
        for index in 0..self.config.partition_count {
            if let Ok(partition) = PartitionId::try_from(index) {
                self.readers.insert(partition, Arc::clone(&reader));
            }
        }
        self
    }

    /// Handler configuration
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Number of partitions the feed has
    pub fn partition_count(&self) -> usize {
        self.config.partition_count
    }

    /// Check a request against the handler's partitions
    pub fn validate(&self, request: &PageRequest) -> Result<()> {
        if request.partition_count != self.config.partition_count {
            return Err(Error::PartitionCountMismatch {
                expected: self.config.partition_count,
                actual: request.partition_count,
            });
        }

        if request.cursors.is_empty() {
            return Err(Error::cursors_missing(Vec::new()));
        }

        let mut seen = HashSet::new();
        for cursor in &request.cursors {
            if !self.readers.contains_key(&cursor.partition) {
                return Err(Error::UnknownPartition {
                    partition: cursor.partition,
                });
            }
            if !seen.insert(cursor.partition) {
                return Err(Error::invalid_parameter(format!(
                    "cursor{}",
                    cursor.partition
                )));
            }
        }

        let missing: Vec<PartitionId> = self
            .config
            .required_partitions
            .iter()
            .copied()
            .filter(|p| !seen.contains(p))
            .collect();
        if !missing.is_empty() {
            return Err(Error::cursors_missing(missing));
        }

        Ok(())
    }

    /// Parse, validate and serve a request given as query parameters.
    ///
    /// The page size hint is only checked once the partition count and
    /// cursors have been accepted.
    pub fn handle_query(&self, params: &HashMap<String, String>) -> Result<PageStream> {
        let request = PageRequest::from_query(params)?;
        self.validate(&request)?;
        let hint = PageRequest::page_size_hint_from_query(params)?;
        self.handle(&request.with_page_size_hint(hint))
    }

    /// Validate a request and build its page stream
    pub fn handle(&self, request: &PageRequest) -> Result<PageStream> {
        self.validate(request)?;

        let budget = self.config.page_budget(request.page_size_hint);
        let headers = Arc::new(request.headers.clone());
        debug!(
            partitions = ?request.partitions(),
            ?budget,
            concurrent = self.config.concurrent,
            "Handling page request"
        );

        let mut partitions = Vec::with_capacity(request.cursors.len());
        for cursor in &request.cursors {
            let reader = self
                .readers
                .get(&cursor.partition)
                .cloned()
                .ok_or(Error::UnknownPartition {
                    partition: cursor.partition,
                })?;
            let read = PartitionRead {
                reader,
                partition: cursor.partition,
                cursor: cursor.token.clone(),
                headers: Arc::clone(&headers),
                budget,
                reads_left: self.config.max_reads_per_partition.max(1),
                done: false,
            };
            partitions.push(read.into_stream());
        }

        let merged: PageStream = if self.config.concurrent {
            stream::select_all(partitions).boxed()
        } else {
            stream::iter(partitions).flatten().boxed()
        };

        Ok(stop_after_error(merged))
    }
}

/// Read state of one partition within a page
struct PartitionRead {
    reader: Arc<dyn DataReader>,
    partition: PartitionId,
    cursor: String,
    headers: Arc<HeaderSelection>,
    budget: PageBudget,
    reads_left: usize,
    done: bool,
}

impl PartitionRead {
    fn into_stream(self) -> PageStream {
        stream::try_unfold(self, |mut state| async move {
            if state.done {
                return Ok::<_, Error>(None);
            }
            let items = state.next_items().await?;
            Ok(Some((items, state)))
        })
        .map_ok(|items| stream::iter(items.into_iter().map(Ok::<_, Error>)))
        .try_flatten()
        .boxed()
    }

    async fn next_items(&mut self) -> Result<Vec<PageItem>> {
        let batch = self
            .reader
            .read(self.partition, &self.cursor, &self.headers, &self.budget)
            .await
            .inspect_err(|e| warn!(partition = self.partition, error = %e, "Reader failed"))?;

        let count = batch.events.len();
        let bytes: usize = batch.events.iter().map(|e| e.data.to_string().len()).sum();
        self.budget = self.budget.consume(count, bytes);
        self.reads_left -= 1;
        self.done = count == 0
            || batch.is_last()
            || self.budget.is_exhausted()
            || self.reads_left == 0;

        debug!(
            partition = self.partition,
            events = count,
            cursor = %batch.next_cursor,
            "Partition read"
        );

        self.cursor.clone_from(&batch.next_cursor);
        let mut items: Vec<PageItem> = batch.events.into_iter().map(PageItem::Event).collect();
        items.push(PageItem::Checkpoint(Cursor::new(
            self.partition,
            batch.next_cursor,
        )));
        Ok(items)
    }
}

/// End a stream right after its first error
fn stop_after_error(items: PageStream) -> PageStream {
    items
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        })
        .boxed()
}

#[cfg(test)]
mod tests;
