//! Engine types
//!
//! Configuration, phases and run summaries for the poll engine.

use super::backoff::BackoffPolicy;
use crate::state::{PollCursor, DEFAULT_WINDOW};
use std::time::Duration;

/// Default ceiling for server wait hints
pub const DEFAULT_MAX_RETRY_AFTER: Duration = Duration::from_secs(300);

/// What to do when the server no longer has data at the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapPolicy {
    /// Log a warning, count it, keep tailing
    #[default]
    Warn,
    /// Stop with `Error::HistoryTruncated`
    Fail,
}

/// Configuration for a poll run
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Wait after a poll that produced nothing new
    pub interval: Duration,
    /// Granularity at which waits observe cancellation
    pub slice: Duration,
    /// Wait schedule after transient failures
    pub backoff: BackoffPolicy,
    /// Reaction to server-side history truncation
    pub gap_policy: GapPolicy,
    /// Keys kept by the deduplicator
    pub dedup_window: usize,
    /// Stop cleanly after this many items
    pub max_items: Option<u64>,
    /// Longest server `Retry-After` hint honoured
    pub max_retry_after: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            slice: Duration::from_secs(1),
            backoff: BackoffPolicy::default(),
            gap_policy: GapPolicy::Warn,
            dedup_window: DEFAULT_WINDOW,
            max_items: None,
            max_retry_after: DEFAULT_MAX_RETRY_AFTER,
        }
    }
}

impl PollConfig {
    /// Create a config with the given poll interval
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Set the sleep slice
    #[must_use]
    pub fn slice(mut self, slice: Duration) -> Self {
        self.slice = slice;
        self
    }

    /// Set the backoff policy
    #[must_use]
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the gap policy
    #[must_use]
    pub fn gap_policy(mut self, policy: GapPolicy) -> Self {
        self.gap_policy = policy;
        self
    }

    /// Set the deduplication window size
    #[must_use]
    pub fn dedup_window(mut self, size: usize) -> Self {
        self.dedup_window = size;
        self
    }

    /// Stop after `limit` items
    #[must_use]
    pub fn max_items(mut self, limit: Option<u64>) -> Self {
        self.max_items = limit;
        self
    }

    /// Cap server wait hints at `limit`
    #[must_use]
    pub fn max_retry_after(mut self, limit: Duration) -> Self {
        self.max_retry_after = limit;
        self
    }
}

/// Why a poll run stopped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The cancellation token fired
    Cancelled,
    /// `max_items` items were emitted
    LimitReached,
}

/// State of the poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// About to fetch with the current cursor
    Fetching,
    /// Caught up; waiting one interval
    IdleWait,
    /// Waiting after a transient failure
    BackoffWait(Duration),
    /// Finished
    Stopped(StopReason),
}

/// What one fetch attempt produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// New items were emitted
    Data {
        /// Number of items emitted
        emitted: usize,
    },
    /// Nothing new (an empty batch, or only duplicates)
    Empty,
    /// Retryable failure
    Transient {
        /// Consecutive failures including this one
        failures: u32,
        /// Server wait hint
        retry_after: Option<Duration>,
    },
}

impl PollPhase {
    /// Phase that follows a fetch outcome.
    ///
    /// New data is fetched again immediately to catch up on bursts.
    /// A server wait hint can lengthen a backoff wait but never shorten it,
    /// and is capped at `max_retry_after`.
    pub fn after_fetch(outcome: &FetchOutcome, config: &PollConfig) -> PollPhase {
        match outcome {
            FetchOutcome::Data { .. } => PollPhase::Fetching,
            FetchOutcome::Empty => PollPhase::IdleWait,
            FetchOutcome::Transient {
                failures,
                retry_after,
            } => {
                let delay = config.backoff.delay(*failures);
                let hinted = retry_after.map(|hint| hint.min(config.max_retry_after));
                PollPhase::BackoffWait(hinted.map_or(delay, |hint| delay.max(hint)))
            }
        }
    }

    /// Whether the loop has finished
    pub fn is_stopped(&self) -> bool {
        matches!(self, PollPhase::Stopped(_))
    }
}

/// Statistics for a finished poll run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSummary {
    /// Successful fetches
    pub polls: u64,
    /// Items handed to the sink
    pub items_emitted: u64,
    /// Items dropped as already emitted
    pub duplicates_skipped: u64,
    /// Transient failures absorbed
    pub transient_failures: u64,
    /// Times the server reported truncated history
    pub truncations: u64,
    /// Cursor at the end of the run
    pub final_cursor: PollCursor,
    /// Why the run ended
    pub stop_reason: StopReason,
}
