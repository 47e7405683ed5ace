//! CLI module
//!
//! Command-line interface for serving and following feeds.
//!
//! # Commands
//!
//! - `serve` - Serve an NDJSON events file over HTTP
//! - `fetch` - Follow a feed and print its events
//! - `cursors` - Show the persisted cursor table

mod commands;
mod runner;
mod server;

pub use commands::{Cli, Commands};
pub use runner::Runner;
pub use server::{router, serve};
