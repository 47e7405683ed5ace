//! Page sources the sync engine can pull from

use super::Client;
use crate::error::Result;
use crate::handler::PageHandler;
use crate::protocol::PageRequest;
use crate::receiver::{receive_items, EventReceiver};
use async_trait::async_trait;

/// Anything that can serve a page into a receiver
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Number of partitions of the feed
    fn partition_count(&self) -> usize;

    /// Fetch one page into `receiver`
    async fn fetch_page(
        &self,
        request: &PageRequest,
        receiver: &mut dyn EventReceiver,
    ) -> Result<()>;
}

#[async_trait]
impl PageSource for Client {
    fn partition_count(&self) -> usize {
        Client::partition_count(self)
    }

    async fn fetch_page(
        &self,
        request: &PageRequest,
        receiver: &mut dyn EventReceiver,
    ) -> Result<()> {
        self.fetch(request, receiver).await
    }
}

/// In-process source, skipping the transport
#[async_trait]
impl PageSource for PageHandler {
    fn partition_count(&self) -> usize {
        PageHandler::partition_count(self)
    }

    async fn fetch_page(
        &self,
        request: &PageRequest,
        receiver: &mut dyn EventReceiver,
    ) -> Result<()> {
        let items = self.handle(request)?;
        receive_items(receiver, items).await
    }
}
