//! Rehydration gate: `Uninitialized -> Ready`, flipped once per process.

use std::sync::Arc;

use tokio::sync::watch;

/// Signals that a store's persisted state load has been attempted.
///
/// The gate means "attempt completed", not "data present": a failed or empty
/// load opens it as well.
#[derive(Debug, Clone)]
pub struct HydrationGate {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for HydrationGate {
    fn default() -> Self {
        Self::new()
    }
}

impl HydrationGate {
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Opens the gate. Returns `true` only for the call that flipped it.
    pub fn open(&self) -> bool {
        self.sender.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }

    pub fn is_hydrated(&self) -> bool {
        *self.sender.borrow()
    }

    /// Suspends until the gate is open.
    pub async fn wait_ready(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = receiver.wait_for(|ready| *ready).await;
    }
}
