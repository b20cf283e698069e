//! Cooperative shutdown signal shared by the dispatch loop and token retries.
//!
//! Built on a `tokio::sync::watch` channel carrying a single `bool`. Waits made
//! through [`Shutdown::sleep`] end early once shutdown is requested, which is the
//! only way out of the token bridge's unbounded retry loop.
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

/// Sending side; cloneable so a signal handler and tests can both hold one.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

/// Receiving side, held by the bridge.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Create a linked handle/receiver pair.
    pub fn channel() -> (ShutdownHandle, Shutdown) {
        let (tx, rx) = watch::channel(false);
        (ShutdownHandle { tx }, Shutdown { rx })
    }

    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Sleep for `dur`. Returns `false` if shutdown was requested before or
    /// during the wait, `true` if the full interval elapsed.
    pub async fn sleep(&mut self, dur: Duration) -> bool {
        let deadline = Instant::now() + dur;
        loop {
            if self.is_requested() {
                return false;
            }
            tokio::select! {
                _ = sleep_until(deadline) => return !self.is_requested(),
                changed = self.rx.changed() => {
                    if changed.is_err() {
                        // Every handle is gone; nobody can request shutdown any more
                        sleep_until(deadline).await;
                        return !self.is_requested();
                    }
                }
            }
        }
    }

    /// Resolve once shutdown is requested. Never resolves if every handle was
    /// dropped without triggering.
    pub async fn requested(&mut self) {
        while !self.is_requested() {
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
