//! Error types for ZeroEventHub
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use crate::types::PartitionId;
use thiserror::Error;

/// The main error type for ZeroEventHub
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Protocol / Request Errors
    // ============================================================================
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("cursors are missing{}", describe_partitions(.partitions))]
    CursorsMissing { partitions: Vec<PartitionId> },

    #[error("Unknown partition: {partition}")]
    UnknownPartition { partition: PartitionId },

    #[error("Partition count doesn't match as expected")]
    PartitionCountMismatch { expected: usize, actual: usize },

    #[error("Parameter {name} not found")]
    MissingParameter { name: String },

    #[error("Invalid parameter {name}")]
    InvalidParameter { name: String },

    #[error("Invalid cursor '{cursor}' for partition {partition}")]
    InvalidCursor {
        partition: PartitionId,
        cursor: String,
    },

    // ============================================================================
    // Producer Errors
    // ============================================================================
    #[error("Data reader failed for partition {partition}: {message}")]
    DataReader {
        partition: PartitionId,
        message: String,
    },

    // ============================================================================
    // Consumer Errors
    // ============================================================================
    #[error("{message}: {source}")]
    Receiver {
        message: String,
        #[source]
        source: Box<Error>,
    },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Decoding / Configuration Errors
    // ============================================================================
    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

fn describe_partitions(partitions: &[PartitionId]) -> String {
    if partitions.is_empty() {
        return String::new();
    }
    let ids: Vec<String> = partitions.iter().map(ToString::to_string).collect();
    format!(" for partitions {}", ids.join(", "))
}

impl Error {
    /// Create a request-level API error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a missing cursors error
    pub fn cursors_missing(partitions: Vec<PartitionId>) -> Self {
        Self::CursorsMissing { partitions }
    }

    /// Create a missing parameter error
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(name: impl Into<String>) -> Self {
        Self::InvalidParameter { name: name.into() }
    }

    /// Create a data reader error
    pub fn data_reader(partition: PartitionId, message: impl Into<String>) -> Self {
        Self::DataReader {
            partition,
            message: message.into(),
        }
    }

    /// Wrap an error raised by an event receiver
    pub fn receiver(message: impl Into<String>, source: Error) -> Self {
        Self::Receiver {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// HTTP status this error maps to when surfaced by the feed endpoint
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Api { status, .. } | Error::HttpStatus { status, .. } => *status,
            Error::CursorsMissing { .. }
            | Error::UnknownPartition { .. }
            | Error::PartitionCountMismatch { .. }
            | Error::MissingParameter { .. }
            | Error::InvalidParameter { .. }
            | Error::InvalidCursor { .. } => 400,
            Error::Timeout { .. } => 504,
            Error::Http(_) => 502,
            _ => 500,
        }
    }

    /// Check if this error rejects the request itself (no page was produced)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::CursorsMissing { .. }
                | Error::UnknownPartition { .. }
                | Error::PartitionCountMismatch { .. }
                | Error::MissingParameter { .. }
                | Error::InvalidParameter { .. }
                | Error::InvalidCursor { .. }
        )
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for ZeroEventHub
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::cursors_missing(vec![]);
        assert_eq!(err.to_string(), "cursors are missing");

        let err = Error::cursors_missing(vec![0, 2]);
        assert_eq!(err.to_string(), "cursors are missing for partitions 0, 2");

        let err = Error::http_status(404, "Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");

        let err = Error::invalid_parameter("n");
        assert_eq!(err.to_string(), "Invalid parameter n");
    }

    #[test]
    fn test_status_code() {
        assert_eq!(Error::cursors_missing(vec![]).status_code(), 400);
        assert_eq!(Error::UnknownPartition { partition: 7 }.status_code(), 400);
        assert_eq!(Error::api(422, "nope").status_code(), 422);
        assert_eq!(Error::data_reader(0, "disk").status_code(), 500);
        assert_eq!(Error::Timeout { timeout_ms: 10 }.status_code(), 504);
    }

    #[test]
    fn test_is_validation() {
        assert!(Error::cursors_missing(vec![1]).is_validation());
        assert!(Error::invalid_parameter("pagesizehint").is_validation());
        assert!(!Error::data_reader(0, "boom").is_validation());
        assert!(!Error::api(400, "bad").is_validation());
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::Timeout { timeout_ms: 1000 }.is_retryable());
        assert!(Error::http_status(429, "").is_retryable());
        assert!(Error::http_status(503, "").is_retryable());

        assert!(!Error::http_status(400, "").is_retryable());
        assert!(!Error::http_status(404, "").is_retryable());
        assert!(!Error::cursors_missing(vec![]).is_retryable());
    }

    #[test]
    fn test_receiver_error_keeps_source() {
        let err = Error::receiver(
            "error while receiving event",
            Error::Other("sink closed".to_string()),
        );
        assert_eq!(err.to_string(), "error while receiving event: sink closed");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
