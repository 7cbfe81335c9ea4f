//! Connectivity notifications for the error logger.

use std::sync::Arc;

use tokio::sync::watch;

/// Source of online/offline state and its transitions.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;

    /// Receiver that changes on every online/offline transition.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Connectivity flag driven by whoever observes the network (a platform
/// hook, a health probe, or a test).
#[derive(Debug, Clone)]
pub struct ConnectivityState {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivityState {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    pub fn online() -> Self {
        Self::new(true)
    }

    pub fn offline() -> Self {
        Self::new(false)
    }

    /// Record the current state. Subscribers are woken only on a change.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            tracing::debug!(online, "connectivity changed");
        }
    }
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self::online()
    }
}

impl Connectivity for ConnectivityState {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
