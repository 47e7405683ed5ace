//! Common types used throughout ZeroEventHub
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Identifier of an independent, ordered partition of a feed
pub type PartitionId = u32;

/// Event header mapping (sorted for stable serialization)
pub type Headers = BTreeMap<String, String>;

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff between retries or idle polls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

impl BackoffType {
    /// Delay before the given attempt (0-based), capped at `max`
    pub fn delay(self, attempt: u32, initial: Duration, max: Duration) -> Duration {
        let delay = match self {
            BackoffType::Constant => initial,
            BackoffType::Linear => initial.saturating_mul(attempt.saturating_add(1)),
            BackoffType::Exponential => initial.saturating_mul(2u32.saturating_pow(attempt)),
        };

        std::cmp::min(delay, max)
    }
}
