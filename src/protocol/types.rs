//! Protocol value types
//!
//! Cursors, events and the small policy types carried by a page request.

use crate::types::{Headers, JsonValue, PartitionId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token addressing the start of a partition
pub const FIRST_CURSOR: &str = "_first";

/// Token addressing the end of a partition; no data will ever follow it
pub const LAST_CURSOR: &str = "_last";

/// Header selection value requesting every header the producer has
pub const ALL_HEADERS: &str = "_all";

// ============================================================================
// Cursor
// ============================================================================

/// A partition-scoped resumption token.
///
/// The token is opaque outside the producer that issued it: cursors compare by
/// equality only, never by order. Emitted mid-page it acts as a checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor {
    /// Partition this cursor belongs to
    pub partition: PartitionId,
    /// Opaque position token
    #[serde(rename = "cursor")]
    pub token: String,
}

impl Cursor {
    /// Create a cursor for a partition
    pub fn new(partition: PartitionId, token: impl Into<String>) -> Self {
        Self {
            partition,
            token: token.into(),
        }
    }

    /// Cursor at the start of a partition
    pub fn first(partition: PartitionId) -> Self {
        Self::new(partition, FIRST_CURSOR)
    }

    /// Cursor at the end of a partition
    pub fn last(partition: PartitionId) -> Self {
        Self::new(partition, LAST_CURSOR)
    }

    /// Check if this cursor addresses the start of its partition
    pub fn is_first(&self) -> bool {
        self.token == FIRST_CURSOR
    }

    /// Check if this cursor marks its partition as exhausted
    pub fn is_last(&self) -> bool {
        self.token == LAST_CURSOR
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.partition, self.token)
    }
}

// ============================================================================
// Event
// ============================================================================

/// All properties received relating to a certain event.
///
/// `headers: None` means headers were not requested; `Some(empty)` means they
/// were requested and the event has none. The two never compare equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Partition the event was read from
    pub partition: PartitionId,
    /// Requested headers, if any were requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,
    /// Opaque payload
    #[serde(default)]
    pub data: JsonValue,
}

impl Event {
    /// Create an event
    pub fn new(partition: PartitionId, headers: Option<Headers>, data: impl Into<JsonValue>) -> Self {
        Self {
            partition,
            headers,
            data: data.into(),
        }
    }
}

// ============================================================================
// Page Item
// ============================================================================

/// One element of a page, in producer emission order
#[derive(Debug, Clone, PartialEq)]
pub enum PageItem {
    /// An event
    Event(Event),
    /// A progress marker for a partition
    Checkpoint(Cursor),
}

impl PageItem {
    /// Partition the item belongs to
    pub fn partition(&self) -> PartitionId {
        match self {
            Self::Event(event) => event.partition,
            Self::Checkpoint(cursor) => cursor.partition,
        }
    }

    /// Check if this is a checkpoint
    pub fn is_checkpoint(&self) -> bool {
        matches!(self, Self::Checkpoint(_))
    }
}

impl From<Event> for PageItem {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}

impl From<Cursor> for PageItem {
    fn from(cursor: Cursor) -> Self {
        Self::Checkpoint(cursor)
    }
}

// ============================================================================
// Header Selection
// ============================================================================

/// Which event headers the client wants delivered
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HeaderSelection {
    /// No headers; events carry `headers: None`
    #[default]
    None,
    /// Every header the producer has
    All,
    /// Only the named headers
    Named(Vec<String>),
}

impl HeaderSelection {
    /// Select the given header names (an empty list selects none)
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            Self::None
        } else if names.iter().any(|n| n == ALL_HEADERS) {
            Self::All
        } else {
            Self::Named(names)
        }
    }

    /// Parse the comma separated `headers` query value
    pub fn parse(param: Option<&str>) -> Self {
        let Some(param) = param else {
            return Self::None;
        };
        Self::named(
            param
                .trim_end_matches(',')
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty()),
        )
    }

    /// Render as the `headers` query value (None when nothing is requested)
    pub fn to_param(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::All => Some(ALL_HEADERS.to_string()),
            Self::Named(names) => Some(names.join(",")),
        }
    }

    /// Check if no headers are requested
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Apply this selection to an event's full header set
    pub fn project(&self, headers: &Headers) -> Option<Headers> {
        match self {
            Self::None => None,
            Self::All => Some(headers.clone()),
            Self::Named(names) => Some(
                names
                    .iter()
                    .filter_map(|name| headers.get_key_value(name))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
        }
    }
}

// ============================================================================
// Page Budget
// ============================================================================

/// Upper bound on what one partition may contribute to a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageBudget {
    /// Maximum number of events
    pub max_events: Option<usize>,
    /// Maximum encoded payload bytes
    pub max_bytes: Option<usize>,
}

impl PageBudget {
    /// No bound at all
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Bound by event count
    pub fn events(max_events: usize) -> Self {
        Self {
            max_events: Some(max_events),
            max_bytes: None,
        }
    }

    /// Also bound by bytes
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    /// Budget left after spending `events` events and `bytes` bytes
    #[must_use]
    pub fn consume(&self, events: usize, bytes: usize) -> Self {
        Self {
            max_events: self.max_events.map(|m| m.saturating_sub(events)),
            max_bytes: self.max_bytes.map(|m| m.saturating_sub(bytes)),
        }
    }

    /// Check if nothing more fits
    pub fn is_exhausted(&self) -> bool {
        self.max_events == Some(0) || self.max_bytes == Some(0)
    }
}
