//! Poll state module
//!
//! Tracks read progress through a remote resource's timeline.
//!
//! # Overview
//!
//! The state module provides:
//! - `PollCursor` - The resumable position handed to each fetch
//! - `CursorTracker` - Owns the cursor and refuses to move it backwards
//! - `Deduplicator` - Drops items that were already emitted
//! - `PollState` - Per-run bookkeeping (cursor, failures, last success)
//!
//! Nothing here performs I/O. State lives only as long as one poll run;
//! resumption across processes goes through the server-issued token.

mod cursor;
mod dedup;
mod types;

pub use cursor::CursorTracker;
pub use dedup::{Deduplicator, MergeOutcome, DEFAULT_WINDOW};
pub use types::{FetchBatch, Item, PollCursor, PollState, StartMode};

#[cfg(test)]
mod tests;
