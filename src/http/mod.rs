//! HTTP client module
//!
//! Provides the HTTP transport the page client runs on.
//!
//! # Features
//!
//! - **Opt-in Retries**: connect errors, timeouts and retryable statuses
//! - **Backoff Strategies**: Constant, linear, and exponential backoff
//! - **Status Mapping**: non-2xx responses become `Error::HttpStatus`

mod client;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder};
