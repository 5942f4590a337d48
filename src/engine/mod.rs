//! Poll engine module
//!
//! The live-tail loop: fetch with the current cursor, drop what was
//! already emitted, emit the rest in order, then commit the cursor.
//!
//! # Overview
//!
//! The engine module provides:
//! - `PollEngine` - Drives one resource until cancelled or fatally failed
//! - `BatchSource` - What the engine fetches from
//! - `PollConfig` - Interval, sleep slice, backoff and limits
//! - `PollPhase` - The loop's state machine
//!
//! Transient failures never escape the engine. Fatal failures stop the
//! loop and are returned unchanged. Cancellation is a clean stop.

mod backoff;
mod sleep;
mod types;

pub use backoff::BackoffPolicy;
pub use sleep::sleep_cancellable;
pub use types::{
    FetchOutcome, GapPolicy, PollConfig, PollPhase, PollSummary, StopReason,
    DEFAULT_MAX_RETRY_AFTER,
};

use crate::error::{Error, Result};
use crate::output::OutputSink;
use crate::state::{CursorTracker, Deduplicator, FetchBatch, PollCursor, PollState};
use crate::types::millis_to_rfc3339;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// A resource the engine can poll
#[async_trait]
pub trait BatchSource: Send {
    /// Name used in log messages (usually the endpoint path)
    fn name(&self) -> &str;

    /// Fetch everything after `cursor`
    async fn fetch(&mut self, cursor: &PollCursor) -> Result<FetchBatch>;

    /// Whether each fetch returns the full current state rather than the
    /// events after the cursor
    fn is_snapshot(&self) -> bool {
        false
    }
}

/// Adapts an async closure into a `BatchSource`
pub struct FnSource<F> {
    name: String,
    fetch: F,
}

impl<F> FnSource<F> {
    /// Wrap `fetch` under `name`
    pub fn new(name: impl Into<String>, fetch: F) -> Self {
        Self {
            name: name.into(),
            fetch,
        }
    }
}

#[async_trait]
impl<F, Fut> BatchSource for FnSource<F>
where
    F: FnMut(PollCursor) -> Fut + Send,
    Fut: Future<Output = Result<FetchBatch>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&mut self, cursor: &PollCursor) -> Result<FetchBatch> {
        (self.fetch)(cursor.clone()).await
    }
}

#[derive(Debug, Default)]
struct Counters {
    polls: u64,
    items_emitted: u64,
    duplicates_skipped: u64,
    transient_failures: u64,
    truncations: u64,
}

/// Sequential poll loop for a single resource
#[derive(Debug)]
pub struct PollEngine {
    config: PollConfig,
    state: PollState,
    dedup: Deduplicator,
    phase: PollPhase,
    counters: Counters,
}

impl PollEngine {
    /// Create an engine starting at the tracker's cursor
    pub fn new(config: PollConfig, cursor: CursorTracker) -> Self {
        let dedup = Deduplicator::new(config.dedup_window);
        Self {
            config,
            state: PollState::new(cursor),
            dedup,
            phase: PollPhase::Fetching,
            counters: Counters::default(),
        }
    }

    /// Current cursor
    pub fn cursor(&self) -> &PollCursor {
        self.state.cursor.current()
    }

    /// Poll bookkeeping
    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Current phase of the loop
    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    /// Run until `cancel` fires, `max_items` is reached, or a fatal error.
    ///
    /// Cancellation is observed at the top of every iteration, while a
    /// fetch is in flight, and at every sleep slice.
    #[instrument(skip_all, fields(source = %source.name()))]
    pub async fn run(
        &mut self,
        source: &mut dyn BatchSource,
        sink: &mut dyn OutputSink,
        cancel: &CancellationToken,
    ) -> Result<PollSummary> {
        info!(
            cursor = %self.cursor(),
            interval = ?self.config.interval,
            "Starting poll loop"
        );
        self.phase = PollPhase::Fetching;

        loop {
            self.phase = match self.phase {
                PollPhase::Fetching => self.fetch_once(source, sink, cancel).await?,
                PollPhase::IdleWait => self.wait(self.config.interval, cancel).await,
                PollPhase::BackoffWait(delay) => {
                    debug!(delay = ?delay, "Backing off");
                    self.wait(delay, cancel).await
                }
                PollPhase::Stopped(reason) => {
                    let summary = self.summary(reason);
                    info!(
                        reason = ?reason,
                        cursor = %summary.final_cursor,
                        items = summary.items_emitted,
                        "Poll loop stopped"
                    );
                    return Ok(summary);
                }
            };
        }
    }

    async fn wait(&self, delay: Duration, cancel: &CancellationToken) -> PollPhase {
        if sleep_cancellable(delay, self.config.slice, cancel).await {
            PollPhase::Stopped(StopReason::Cancelled)
        } else {
            PollPhase::Fetching
        }
    }

    async fn fetch_once(
        &mut self,
        source: &mut dyn BatchSource,
        sink: &mut dyn OutputSink,
        cancel: &CancellationToken,
    ) -> Result<PollPhase> {
        if cancel.is_cancelled() {
            return Ok(PollPhase::Stopped(StopReason::Cancelled));
        }

        let name = source.name().to_string();
        let snapshot = source.is_snapshot();
        let cursor = self.cursor().clone();
        debug!(cursor = %cursor, "Fetching");

        let fetched = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = source.fetch(&cursor) => Some(result),
        };
        let Some(result) = fetched else {
            return Ok(PollPhase::Stopped(StopReason::Cancelled));
        };

        let outcome = match result.and_then(|batch| self.apply_batch(batch, sink, snapshot)) {
            Ok(outcome) => outcome,
            Err(e) if e.is_retryable() => {
                let failures = self.state.record_failure();
                self.counters.transient_failures += 1;
                warn!(
                    source = %name,
                    cursor = %cursor,
                    failures,
                    error = %e,
                    "Transient fetch failure"
                );
                FetchOutcome::Transient {
                    failures,
                    retry_after: e.retry_after(),
                }
            }
            Err(e) => {
                error!(
                    source = %name,
                    cursor = %cursor,
                    error = %e,
                    "Fatal poll failure"
                );
                return Err(e);
            }
        };

        if self.limit_reached() {
            return Ok(PollPhase::Stopped(StopReason::LimitReached));
        }
        Ok(PollPhase::after_fetch(&outcome, &self.config))
    }

    /// Validate, merge, emit and commit one batch
    fn apply_batch(
        &mut self,
        batch: FetchBatch,
        sink: &mut dyn OutputSink,
        snapshot: bool,
    ) -> Result<FetchOutcome> {
        let mut next = self.state.cursor.next_cursor(&batch)?;

        if let Some((cursor, oldest)) = self.state.cursor.history_gap(&batch) {
            self.counters.truncations += 1;
            match self.config.gap_policy {
                GapPolicy::Fail => return Err(Error::HistoryTruncated { cursor, oldest }),
                GapPolicy::Warn => warn!(
                    cursor = %millis_to_rfc3339(cursor),
                    oldest = %millis_to_rfc3339(oldest),
                    "Server history no longer reaches the cursor, events in between were lost"
                ),
            }
        }

        let received = batch.items.len();
        let merged = if snapshot {
            self.dedup.merge_snapshot(batch.items)
        } else {
            let boundary = self.cursor().position();
            self.dedup.merge(batch.items, boundary)
        };
        self.counters.duplicates_skipped += merged.duplicates as u64;

        let remaining = self
            .config
            .max_items
            .map(|limit| limit.saturating_sub(self.counters.items_emitted));

        let mut emitted = 0usize;
        let mut last_position = None;
        for item in &merged.items {
            if remaining.is_some_and(|r| emitted as u64 >= r) {
                break;
            }
            sink.emit(item)?;
            emitted += 1;
            last_position = Some(item.position);
        }
        sink.flush()?;
        self.counters.items_emitted += emitted as u64;

        // The item limit cut this batch short: the cursor covers only what went out
        // Snapshot records carry old timestamps, so only event cursors move
        if emitted < merged.items.len() {
            next = match last_position {
                Some(position) if !snapshot => PollCursor::Position(position),
                _ => self.cursor().clone(),
            };
        }

        self.state.cursor.commit(next);
        if let Some(position) = self.cursor().position() {
            self.dedup.forget_before(position);
        }
        self.state.record_success();
        self.counters.polls += 1;

        debug!(
            received,
            emitted,
            duplicates = merged.duplicates,
            cursor = %self.cursor(),
            "Batch applied"
        );

        Ok(if emitted > 0 {
            FetchOutcome::Data { emitted }
        } else {
            FetchOutcome::Empty
        })
    }

    fn limit_reached(&self) -> bool {
        self.config
            .max_items
            .is_some_and(|limit| self.counters.items_emitted >= limit)
    }

    fn summary(&self, stop_reason: StopReason) -> PollSummary {
        PollSummary {
            polls: self.counters.polls,
            items_emitted: self.counters.items_emitted,
            duplicates_skipped: self.counters.duplicates_skipped,
            transient_failures: self.counters.transient_failures,
            truncations: self.counters.truncations,
            final_cursor: self.cursor().clone(),
            stop_reason,
        }
    }
}
