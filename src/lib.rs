// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # ZeroEventHub
//!
//! A cursor-addressable, pull-based event feed protocol. Consumers ask for a
//! page of events from a partitioned feed by handing in one cursor per
//! partition; producers answer with events interleaved with checkpoints the
//! consumer can resume from.
//!
//! ## Features
//!
//! - **Page handler**: validates requests and pulls events from partition readers
//! - **NDJSON binding**: axum endpoint and a streaming HTTP client
//! - **Page receiver**: accumulates a page and derives the latest cursor per partition
//! - **Sync engine**: follows a feed page after page, persisting the cursor table
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use zeroeventhub::{Client, CursorStore, SyncEngine, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::new("http://localhost:8080/feed/v1", 2)?;
//!     let store = CursorStore::from_file("cursors.json")?;
//!
//!     let mut engine = SyncEngine::new(client, store);
//!     engine
//!         .run(|page| {
//!             for event in &page.events {
//!                 println!("{}", event.data);
//!             }
//!             Ok(())
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  GET ?n=&cursorN=   ┌──────────────────────────────┐
//! │  SyncEngine  │ ──────────────────▶ │ axum router → PageHandler    │
//! │  CursorStore │                     │   validate → PartitionReads  │
//! │  PageReceiver│ ◀────────────────── │   DataReader (MemoryReader)  │
//! └──────────────┘   NDJSON page       └──────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Cursors, events, page requests
pub mod protocol;

/// NDJSON line codec
pub mod decode;

/// Event receivers and the page accumulator
pub mod receiver;

/// Producer-side data readers
pub mod reader;

/// Producer-side page orchestration
pub mod handler;

/// HTTP transport with timeouts and opt-in retries
pub mod http;

/// Feed client
pub mod client;

/// Cursor table persistence
pub mod state;

/// Client-side pagination loop
pub mod engine;

/// Configuration files
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use client::{Client, PageSource};
pub use config::HubConfig;
pub use engine::{SyncConfig, SyncEngine, SyncStats};
pub use handler::{HandlerConfig, PageHandler, PageStream};
pub use protocol::{
    Cursor, Event, HeaderSelection, PageBudget, PageItem, PageRequest, ALL_HEADERS, FIRST_CURSOR,
    LAST_CURSOR,
};
pub use reader::{DataReader, MemoryReader, ReadBatch};
pub use receiver::{receive_items, EventReceiver, Page, PageReceiver};
pub use state::{CursorStore, CursorTable};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
