//! Cancellable waits

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Sleep for `total`, checking `cancel` at least every `slice`.
///
/// Returns `true` if the wait ended because of cancellation.
pub async fn sleep_cancellable(
    total: Duration,
    slice: Duration,
    cancel: &CancellationToken,
) -> bool {
    let slice = if slice.is_zero() { total } else { slice };
    let deadline = Instant::now() + total;

    loop {
        if cancel.is_cancelled() {
            return true;
        }

        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        let step = slice.min(deadline - now);

        let cancelled = tokio::select! {
            biased;
            () = cancel.cancelled() => true,
            () = tokio::time::sleep(step) => false,
        };
        if cancelled {
            return true;
        }
    }
}
