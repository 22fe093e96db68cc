//! Cooperative cancellation.
//!
//! An [`AbortSignal`] is raised once, typically by the interrupt listener
//! when the user hits Ctrl-C, and stays raised for the rest of the process.
//! Long-running loops (the push-button wait and the EEPROM transfer) poll it
//! between bus transactions and stop before starting the next one; nothing
//! is ever interrupted half-way through a transaction.

use tokio::signal::unix::{self, SignalKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::tracing::prelude::*;

/// Shared abort flag.
///
/// Clones observe the same flag. It cannot be reset.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    token: CancellationToken,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Safe to call from any task, any number of times.
    pub fn raise(&self) {
        self.token.cancel();
    }

    pub fn is_set(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve once the flag is raised.
    pub async fn raised(&self) {
        self.token.cancelled().await
    }

    /// Spawn a task raising this signal on SIGINT.
    ///
    /// The task keeps listening after the first interrupt so that repeated
    /// Ctrl-C presses do not fall back to the default handler and kill the
    /// process in the middle of a bus transaction.
    pub fn listen_for_interrupt(&self) -> std::io::Result<JoinHandle<()>> {
        let mut sigint = unix::signal(SignalKind::interrupt())?;
        let signal = self.clone();
        Ok(tokio::spawn(async move {
            while sigint.recv().await.is_some() {
                warn!("abort!");
                signal.raise();
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_clear() {
        assert!(!AbortSignal::new().is_set());
    }

    #[test]
    fn clones_share_the_flag() {
        let signal = AbortSignal::new();
        let observer = signal.clone();

        signal.raise();
        assert!(observer.is_set());

        // Raising again is harmless and nothing resets it.
        observer.raise();
        assert!(signal.is_set());
    }

    #[tokio::test]
    async fn raised_resolves_after_raise() {
        let signal = AbortSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.raised().await })
        };

        signal.raise();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("waiter should complete")
            .expect("waiter task should not panic");
    }
}
