//! Cross-instance logout notification.
//!
//! One instance publishes a logout marker; every instance sharing the
//! channel observes the change and clears its local session. Subscribers
//! react to the change itself and never read the marker's value back, so
//! any shared watchable medium can implement this.

use chrono::Utc;
use tokio::sync::watch;

/// Publish/observe channel for logout markers.
pub trait LogoutChannel: Send + Sync {
    /// Write a fresh logout marker, waking every subscriber.
    fn publish(&self);

    /// Handle for observing marker changes.
    fn subscribe(&self) -> watch::Receiver<i64>;
}

/// In-process channel over a watch cell. Stands in for a medium shared
/// between real instances (browser storage, OS-level IPC).
pub struct MemoryLogoutChannel {
    tx: watch::Sender<i64>,
}

impl MemoryLogoutChannel {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        MemoryLogoutChannel { tx }
    }
}

impl Default for MemoryLogoutChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl LogoutChannel for MemoryLogoutChannel {
    fn publish(&self) {
        // Timestamp marker; subscribers only care that it changed.
        self.tx.send_replace(Utc::now().timestamp_millis());
    }

    fn subscribe(&self) -> watch::Receiver<i64> {
        self.tx.subscribe()
    }
}
