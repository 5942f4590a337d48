//! Types shared by the cursor tracker, the deduplicator and the engine

use super::cursor::CursorTracker;
use crate::types::{parse_point_in_time, JsonValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Where a poll run starts reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartMode {
    /// Oldest data the server still has
    FromStart,
    /// Only data arriving after the run starts
    FromNow,
    /// A token or position printed by an earlier run
    Resume(String),
}

/// Read progress in a remote resource's timeline.
///
/// Positions are milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollCursor {
    /// Nothing read yet
    #[default]
    Beginning,
    /// Everything up to and including this position was read
    Position(i64),
    /// Server continuation token, with the position it stands for when known
    Token {
        token: String,
        position: Option<i64>,
    },
}

impl PollCursor {
    /// Position in the resource timeline, if one is known
    pub fn position(&self) -> Option<i64> {
        match self {
            PollCursor::Beginning => None,
            PollCursor::Position(p) => Some(*p),
            PollCursor::Token { position, .. } => *position,
        }
    }

    /// Server continuation token, if any
    pub fn token(&self) -> Option<&str> {
        match self {
            PollCursor::Token { token, .. } => Some(token),
            _ => None,
        }
    }

    /// Value a later run can pass back through `StartMode::Resume`
    pub fn resume_value(&self) -> Option<String> {
        match self {
            PollCursor::Beginning => None,
            PollCursor::Position(p) => Some(p.to_string()),
            PollCursor::Token { token, .. } => Some(token.clone()),
        }
    }

    /// Parse a resume value: epoch milliseconds, RFC 3339, or an opaque token
    pub fn from_resume_value(value: &str) -> Self {
        match parse_point_in_time(value) {
            Some(ms) => PollCursor::Position(ms),
            None => PollCursor::Token {
                token: value.to_string(),
                position: None,
            },
        }
    }
}

impl fmt::Display for PollCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollCursor::Beginning => write!(f, "beginning"),
            PollCursor::Position(p) => write!(f, "position:{p}"),
            PollCursor::Token {
                token,
                position: Some(p),
            } => write!(f, "token:{token}@{p}"),
            PollCursor::Token {
                token,
                position: None,
            } => write!(f, "token:{token}"),
        }
    }
}

/// A single log entry or status record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier assigned by the server, when it has one
    pub id: Option<String>,
    /// Position in the resource timeline (epoch milliseconds)
    pub position: i64,
    /// Raw record as returned by the API
    pub payload: JsonValue,
}

impl Item {
    /// Create an item without a server identifier
    pub fn new(position: i64, payload: JsonValue) -> Self {
        Self {
            id: None,
            position,
            payload,
        }
    }

    /// Create an item with a server identifier
    pub fn with_id(id: impl Into<String>, position: i64, payload: JsonValue) -> Self {
        Self {
            id: Some(id.into()),
            position,
            payload,
        }
    }

    /// Identity used for deduplication.
    ///
    /// Items without an id are identified by a digest of position and
    /// payload. `serde_json` maps serialize with sorted keys, so equal
    /// payloads always hash the same.
    pub fn key(&self) -> String {
        match &self.id {
            Some(id) => format!("id:{id}"),
            None => {
                let mut hasher = Sha256::new();
                hasher.update(self.position.to_be_bytes());
                hasher.update(self.payload.to_string().as_bytes());
                format!("sha256:{}", hex::encode(hasher.finalize()))
            }
        }
    }

    /// Digest of the payload alone, ignoring id and position
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.payload.to_string().as_bytes()))
    }
}

/// Result of one fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchBatch {
    /// Items in source order
    pub items: Vec<Item>,
    /// Continuation token for the next fetch
    pub next_token: Option<String>,
    /// Position the server says it has delivered up to
    pub high_watermark: Option<i64>,
    /// Oldest position the server still retains
    pub oldest_available: Option<i64>,
}

impl FetchBatch {
    /// Create a batch from items
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    /// Create an empty batch
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set the continuation token
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.next_token = Some(token.into());
        self
    }

    /// Set the server high-water mark
    #[must_use]
    pub fn with_high_watermark(mut self, position: i64) -> Self {
        self.high_watermark = Some(position);
        self
    }

    /// Set the oldest retained position
    #[must_use]
    pub fn with_oldest_available(mut self, position: i64) -> Self {
        self.oldest_available = Some(position);
        self
    }

    /// Whether the batch carries no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Latest position this batch accounts for
    pub fn trailing_position(&self) -> Option<i64> {
        let newest_item = self.items.iter().map(|item| item.position).max();
        match (newest_item, self.high_watermark) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }
}

/// Bookkeeping for one poll run
#[derive(Debug, Clone)]
pub struct PollState {
    /// Cursor tracker for the polled resource
    pub cursor: CursorTracker,
    /// Transient failures since the last successful fetch
    pub consecutive_failures: u32,
    /// Time of the last successful fetch
    pub last_success: Option<DateTime<Utc>>,
}

impl PollState {
    /// Create a new state around a cursor tracker
    pub fn new(cursor: CursorTracker) -> Self {
        Self {
            cursor,
            consecutive_failures: 0,
            last_success: None,
        }
    }

    /// Record a successful fetch
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.last_success = Some(Utc::now());
    }

    /// Record a transient failure, returning the new failure count
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_failures
    }
}
