//! Configuration file support
//!
//! A single `HubConfig` file (YAML or JSON) carries the settings for both
//! sides of a feed. Every field has a default, so an empty file is valid and
//! command-line flags only need to override what differs.
//!
//! ```yaml
//! server:
//!   port: 8080
//!   path: /feed/v1
//!   handler:
//!     partition_count: 4
//!     default_page_size: 100
//! client:
//!   url: http://localhost:8080/feed/v1
//!   partition_count: 4
//!   state_file: cursors.json
//! ```

use crate::engine::SyncConfig;
use crate::error::{Error, Result};
use crate::handler::HandlerConfig;
use crate::http::HttpClientConfig;
use crate::protocol::HeaderSelection;
use crate::types::{BackoffType, PartitionId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Hub Config
// ============================================================================

/// Root of a configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Producer side
    #[serde(default)]
    pub server: ServerSettings,

    /// Consumer side
    #[serde(default)]
    pub client: ClientSettings,
}

impl HubConfig {
    /// Load a config file; `.json` files are read as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(serde_json::from_str(&content)?)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Parse a YAML document (JSON is valid YAML too)
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

// ============================================================================
// Server Settings
// ============================================================================

/// Settings for serving a feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Route of the feed endpoint
    #[serde(default = "default_path")]
    pub path: String,

    /// Page handler settings
    #[serde(default)]
    pub handler: HandlerConfig,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            path: default_path(),
            handler: HandlerConfig::default(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_path() -> String {
    "/feed/v1".to_string()
}

// ============================================================================
// Client Settings
// ============================================================================

/// Settings for following a feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Feed endpoint URL
    #[serde(default)]
    pub url: Option<String>,

    /// Partition count the feed is expected to have
    #[serde(default = "default_partition_count")]
    pub partition_count: usize,

    /// Partitions to follow (empty = all)
    #[serde(default)]
    pub partitions: Vec<PartitionId>,

    /// Header names to request; `_all` requests every header
    #[serde(default)]
    pub headers: Vec<String>,

    /// Page size hint sent with each request
    #[serde(default)]
    pub page_size_hint: Option<usize>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Retries per request (0 = a failed request is final)
    #[serde(default)]
    pub max_retries: u32,

    /// Cursor table file
    #[serde(default)]
    pub state_file: Option<PathBuf>,

    /// Delay policy between retries and idle polls
    #[serde(default)]
    pub backoff: BackoffSettings,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            url: None,
            partition_count: default_partition_count(),
            partitions: Vec::new(),
            headers: Vec::new(),
            page_size_hint: None,
            timeout_seconds: default_timeout(),
            max_retries: 0,
            state_file: None,
            backoff: BackoffSettings::default(),
        }
    }
}

fn default_partition_count() -> usize {
    1
}

fn default_timeout() -> u64 {
    30
}

impl ClientSettings {
    /// Header selection requested with each page
    pub fn header_selection(&self) -> HeaderSelection {
        HeaderSelection::named(self.headers.iter().cloned())
    }

    /// HTTP transport configuration
    pub fn http_config(&self) -> HttpClientConfig {
        HttpClientConfig::builder()
            .timeout(Duration::from_secs(self.timeout_seconds))
            .max_retries(self.max_retries)
            .backoff(
                self.backoff.backoff_type,
                self.backoff.initial(),
                self.backoff.max(),
            )
            .build()
    }

    /// Sync engine configuration
    pub fn sync_config(&self) -> SyncConfig {
        let mut config = SyncConfig::new()
            .with_headers(self.header_selection())
            .with_backoff(
                self.backoff.backoff_type,
                self.backoff.initial(),
                self.backoff.max(),
            );
        if !self.partitions.is_empty() {
            config = config.with_partitions(self.partitions.clone());
        }
        if let Some(hint) = self.page_size_hint {
            config = config.with_page_size_hint(hint);
        }
        config
    }
}

/// Backoff configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffSettings {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

impl BackoffSettings {
    fn initial(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

fn default_initial_ms() -> u64 {
    500
}

fn default_max_ms() -> u64 {
    30000
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(HubConfig::from_yaml("").unwrap(), HubConfig::default());
        assert_eq!(HubConfig::from_yaml("{}").unwrap(), HubConfig::default());
    }

    #[test]
    fn test_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.path, "/feed/v1");
        assert_eq!(config.server.handler.partition_count, 1);
        assert_eq!(config.client.timeout_seconds, 30);
        assert_eq!(config.client.max_retries, 0);
        assert!(config.client.url.is_none());
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
server:
  port: 9000
  path: /events
  handler:
    partition_count: 4
    required_partitions: [0]
    default_page_size: 50
    concurrent: true
client:
  url: http://localhost:9000/events
  partition_count: 4
  partitions: [0, 2]
  headers: [content-type, _all]
  page_size_hint: 25
  max_retries: 3
  state_file: cursors.json
  backoff:
    type: linear
    initial_ms: 200
    max_ms: 1000
"#;

        let config = HubConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.path, "/events");
        assert_eq!(config.server.handler.partition_count, 4);
        assert_eq!(config.server.handler.required_partitions, vec![0]);
        assert_eq!(config.server.handler.default_page_size, 50);
        assert_eq!(config.server.handler.max_page_size, 1000);
        assert!(config.server.handler.concurrent);

        let client = &config.client;
        assert_eq!(client.url.as_deref(), Some("http://localhost:9000/events"));
        assert_eq!(client.partitions, vec![0, 2]);
        assert_eq!(client.header_selection(), HeaderSelection::All);
        assert_eq!(client.state_file, Some(PathBuf::from("cursors.json")));
        assert_eq!(client.backoff.backoff_type, BackoffType::Linear);
    }

    #[test]
    fn test_client_conversions() {
        let client = ClientSettings {
            partitions: vec![1],
            headers: vec!["h1".to_string()],
            page_size_hint: Some(10),
            timeout_seconds: 5,
            max_retries: 2,
            ..ClientSettings::default()
        };

        let http = client.http_config();
        assert_eq!(http.timeout, Duration::from_secs(5));
        assert_eq!(http.max_retries, 2);
        assert_eq!(http.initial_backoff, Duration::from_millis(500));

        let sync = client.sync_config();
        assert_eq!(sync.partitions, Some(vec![1]));
        assert_eq!(sync.page_size_hint, Some(10));
        assert_eq!(sync.headers, HeaderSelection::named(["h1"]));
    }

    #[test]
    fn test_no_partitions_follows_all() {
        let sync = ClientSettings::default().sync_config();
        assert!(sync.partitions.is_none());
        assert!(sync.headers.is_none());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hub.json");
        std::fs::write(&path, r#"{"client": {"url": "http://feed", "partition_count": 2}}"#)
            .unwrap();

        let config = HubConfig::from_file(&path).unwrap();
        assert_eq!(config.client.partition_count, 2);
        assert_eq!(config.server, ServerSettings::default());
    }

    #[test]
    fn test_missing_file() {
        let err = HubConfig::from_file("/nonexistent/hub.yaml").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = HubConfig::from_yaml("server: [unclosed").unwrap_err();
        assert!(matches!(err, Error::YamlParse(_)));
    }
}
