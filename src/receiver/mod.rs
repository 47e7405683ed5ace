//! Receiver module
//!
//! Consumer-side handling of a page of events and checkpoints.
//!
//! # Overview
//!
//! - `EventReceiver` - the callback contract a page is fed into
//! - `PageReceiver` - accumulates one page (events, checkpoints, latest
//!   checkpoint per partition)
//! - `Page` - the owned result of a completed `PageReceiver`
//! - `receive_items` - feeds a stream of page items into any receiver

mod page;

pub use page::{Page, PageReceiver};

use crate::error::{Error, Result};
use crate::protocol::PageItem;
use crate::types::{Headers, JsonValue, PartitionId};
use async_trait::async_trait;
use futures::{Stream, StreamExt};

/// Handles either events or checkpoints, in the order they arrive.
///
/// A checkpoint in this context is a cursor marking progress in a partition.
#[async_trait]
pub trait EventReceiver: Send {
    /// Process one event
    async fn event(
        &mut self,
        partition: PartitionId,
        headers: Option<Headers>,
        data: JsonValue,
    ) -> Result<()>;

    /// Process one checkpoint
    async fn checkpoint(&mut self, partition: PartitionId, cursor: String) -> Result<()>;
}

/// Deliver a single item, wrapping receiver failures
pub async fn deliver<R>(receiver: &mut R, item: PageItem) -> Result<()>
where
    R: EventReceiver + ?Sized,
{
    match item {
        PageItem::Checkpoint(cursor) => receiver
            .checkpoint(cursor.partition, cursor.token)
            .await
            .map_err(|e| Error::receiver("error while receiving checkpoint", e)),
        PageItem::Event(event) => receiver
            .event(event.partition, event.headers, event.data)
            .await
            .map_err(|e| Error::receiver("error while receiving event", e)),
    }
}

/// Feed a stream of page items into a receiver.
///
/// Stops at the first error, whether it comes from the stream or from the
/// receiver. Items already delivered stay delivered.
pub async fn receive_items<R, S>(receiver: &mut R, items: S) -> Result<()>
where
    R: EventReceiver + ?Sized,
    S: Stream<Item = Result<PageItem>>,
{
    futures::pin_mut!(items);
    while let Some(item) = items.next().await {
        deliver(receiver, item?).await?;
    }
    Ok(())
}
