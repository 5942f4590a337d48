//! Cursor tracker
//!
//! Owns the cursor for one polled resource. The tracker never performs
//! I/O; the engine asks it for the next cursor before emitting a batch and
//! commits that cursor once the batch has been fully emitted.

use super::types::{FetchBatch, PollCursor, StartMode};
use crate::error::{Error, Result};

/// Tracks read progress and enforces monotonic movement
#[derive(Debug, Clone, Default)]
pub struct CursorTracker {
    current: PollCursor,
}

impl CursorTracker {
    /// Build the initial cursor for a start mode.
    ///
    /// `now_ms` is only consulted for `StartMode::FromNow`.
    pub fn initialize(mode: &StartMode, now_ms: i64) -> Self {
        let current = match mode {
            StartMode::FromStart => PollCursor::Beginning,
            StartMode::FromNow => PollCursor::Position(now_ms),
            StartMode::Resume(value) => PollCursor::from_resume_value(value),
        };
        Self { current }
    }

    /// Wrap an existing cursor
    pub fn from_cursor(current: PollCursor) -> Self {
        Self { current }
    }

    /// Current cursor
    pub fn current(&self) -> &PollCursor {
        &self.current
    }

    /// Compute the cursor that follows `batch` without committing it.
    ///
    /// Fails with `InvalidCursorTransition` when the batch reports a
    /// position older than the current one.
    pub fn next_cursor(&self, batch: &FetchBatch) -> Result<PollCursor> {
        let current = self.current.position();
        let reported = batch.trailing_position();

        if let (Some(current), Some(reported)) = (current, reported) {
            if reported < current {
                return Err(Error::InvalidCursorTransition { current, reported });
            }
        }

        let position = reported.or(current);
        let next = match (&batch.next_token, position) {
            (Some(token), position) => PollCursor::Token {
                token: token.clone(),
                position,
            },
            (None, Some(position)) => match &self.current {
                // Keep the server token when nothing newer replaced it
                PollCursor::Token { token, .. } => PollCursor::Token {
                    token: token.clone(),
                    position: Some(position),
                },
                _ => PollCursor::Position(position),
            },
            (None, None) => self.current.clone(),
        };

        Ok(next)
    }

    /// Replace the current cursor with one produced by `next_cursor`
    pub fn commit(&mut self, next: PollCursor) {
        debug_assert!(
            match (self.current.position(), next.position()) {
                (Some(a), Some(b)) => b >= a,
                (Some(_), None) => false,
                _ => true,
            },
            "cursor moved backwards: {} -> {}",
            self.current,
            next
        );
        self.current = next;
    }

    /// Compute and commit the cursor that follows `batch`
    pub fn advance(&mut self, batch: &FetchBatch) -> Result<&PollCursor> {
        let next = self.next_cursor(batch)?;
        self.commit(next);
        Ok(&self.current)
    }

    /// Detect a server that no longer retains data at the cursor.
    ///
    /// Returns `(cursor, oldest)` when the current position falls before
    /// the oldest position the batch says is available. A cursor at the
    /// beginning asked for the oldest data, so it never reports a gap.
    pub fn history_gap(&self, batch: &FetchBatch) -> Option<(i64, i64)> {
        let cursor = self.current.position()?;
        let oldest = batch.oldest_available?;
        (cursor < oldest).then_some((cursor, oldest))
    }
}
