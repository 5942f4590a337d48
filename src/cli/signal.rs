//! Shutdown signals
//!
//! Ctrl-C and, on Unix, a termination request (`SIGTERM`) both cancel the
//! run's token, so a supervisor stop ends a tail as cleanly as Ctrl-C.

use crate::error::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Installed shutdown handlers
#[derive(Debug)]
pub struct ShutdownSignal {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    /// Install the handlers.
    ///
    /// From here on a termination request no longer kills the process.
    pub fn register() -> Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::terminate(),
            )?,
        })
    }

    /// Wait for the first shutdown signal
    pub async fn recv(&mut self) {
        #[cfg(unix)]
        tokio::select! {
            Ok(()) = tokio::signal::ctrl_c() => info!("Interrupt received, stopping"),
            _ = self.terminate.recv() => info!("Termination requested, stopping"),
        }

        #[cfg(not(unix))]
        {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            info!("Interrupt received, stopping");
        }
    }

    /// Cancel `token` on the first shutdown signal
    pub fn cancel_on_signal(mut self, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.recv().await;
            token.cancel();
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_terminate_cancels_token() {
        let signal = ShutdownSignal::register().unwrap();
        let token = CancellationToken::new();
        let handle = signal.cancel_on_signal(token.clone());

        let status = std::process::Command::new("sh")
            .arg("-c")
            .arg(format!("kill -TERM {}", std::process::id()))
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), token.cancelled())
            .await
            .expect("termination request did not cancel the token");
        handle.await.unwrap();
    }
}
