//! Client module
//!
//! Fetches pages from a feed over HTTP and feeds them into an
//! `EventReceiver` as the body streams in.
//!
//! # Example
//!
//! ```no_run
//! use zeroeventhub::{Client, Cursor, HeaderSelection, PageReceiver};
//!
//! # async fn run() -> zeroeventhub::Result<()> {
//! let client = Client::new("https://example.com/feed/v1", 2)?;
//! let mut page = PageReceiver::new();
//! client
//!     .fetch_events(
//!         &[Cursor::first(0), Cursor::first(1)],
//!         Some(100),
//!         &mut page,
//!         &HeaderSelection::None,
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod source;

pub use source::PageSource;

use crate::decode::LineDecoder;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig};
use crate::protocol::{Cursor, HeaderSelection, PageRequest};
use crate::receiver::{deliver, EventReceiver};
use futures::StreamExt;
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

/// HTTP client of a feed
#[derive(Debug, Clone)]
pub struct Client {
    http: HttpClient,
    url: Url,
    partition_count: usize,
}

impl Client {
    /// Create a client with its own HTTP client
    pub fn new(url: &str, partition_count: usize) -> Result<Self> {
        Self::with_config(url, partition_count, HttpClientConfig::default())
    }

    /// Create a client with a configured HTTP client
    pub fn with_config(url: &str, partition_count: usize, config: HttpClientConfig) -> Result<Self> {
        Self::with_http_client(url, partition_count, HttpClient::with_config(config)?)
    }

    /// Create a client on top of an existing HTTP client
    pub fn with_http_client(url: &str, partition_count: usize, http: HttpClient) -> Result<Self> {
        Ok(Self {
            http,
            url: Url::parse(url)?,
            partition_count,
        })
    }

    /// Feed URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Number of partitions the feed is expected to have
    pub fn partition_count(&self) -> usize {
        self.partition_count
    }

    /// Fetch one page and feed it into `receiver`.
    ///
    /// Items are delivered as they are decoded, so a failure part way
    /// through leaves the earlier items delivered.
    pub async fn fetch_events(
        &self,
        cursors: &[Cursor],
        page_size_hint: Option<usize>,
        receiver: &mut dyn EventReceiver,
        headers: &HeaderSelection,
    ) -> Result<()> {
        let request = PageRequest::new(self.partition_count, cursors.to_vec())
            .with_headers(headers.clone())
            .with_page_size_hint(page_size_hint);
        self.fetch(&request, receiver).await
    }

    /// Fetch the page described by `request`
    pub async fn fetch(
        &self,
        request: &PageRequest,
        receiver: &mut dyn EventReceiver,
    ) -> Result<()> {
        if request.cursors.is_empty() {
            return Err(Error::cursors_missing(Vec::new()));
        }

        debug!(url = %self.url, partitions = ?request.partitions(), "Fetching page");
        let response = self.http.get(self.url.as_str(), &request.to_query()).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(());
        }

        let mut body = response.bytes_stream();
        let mut decoder = LineDecoder::new();
        while let Some(chunk) = body.next().await {
            decoder.feed(&chunk?);
            while let Some(item) = decoder.next_item()? {
                deliver(&mut *receiver, item).await?;
            }
        }
        while let Some(item) = decoder.finish()? {
            deliver(&mut *receiver, item).await?;
        }

        debug!(lines = decoder.lines(), "Page received");
        Ok(())
    }
}
