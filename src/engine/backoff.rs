//! Backoff policy for transient fetch failures

use crate::http::calculate_backoff;
use crate::types::BackoffType;
use std::time::Duration;

/// Maps the consecutive-failure count to a wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Growth curve
    pub backoff_type: BackoffType,
    /// Wait after the first failure
    pub initial: Duration,
    /// Upper bound for any wait
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial: Duration::from_secs(1),
            max: Duration::from_secs(60),
        }
    }
}

impl BackoffPolicy {
    /// Create a policy
    pub fn new(backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        Self {
            backoff_type,
            initial,
            max,
        }
    }

    /// Wait before retrying after `failures` consecutive failures.
    ///
    /// Non-decreasing in `failures` and never above `max`. Zero failures
    /// means no wait.
    pub fn delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        calculate_backoff(self.backoff_type, self.initial, self.max, failures - 1)
    }
}
