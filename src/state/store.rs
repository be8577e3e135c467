use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{dao::document_store::DocumentStore, error::ServiceError};

/// Shared handle to the currently installed remote store.
///
/// Starts empty (degraded) until the storage supervisor installs a backend. Clones
/// share the same slot.
#[derive(Clone)]
pub struct StoreSlot {
    inner: Arc<SlotInner>,
}

struct SlotInner {
    store: RwLock<Option<Arc<dyn DocumentStore>>>,
    degraded: watch::Sender<bool>,
}

impl StoreSlot {
    /// Empty slot, degraded until a store is installed.
    pub fn new() -> Self {
        let (degraded, _rx) = watch::channel(true);
        Self {
            inner: Arc::new(SlotInner {
                store: RwLock::new(None),
                degraded,
            }),
        }
    }

    /// Slot with `store` already installed.
    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        let (degraded, _rx) = watch::channel(false);
        Self {
            inner: Arc::new(SlotInner {
                store: RwLock::new(Some(store)),
                degraded,
            }),
        }
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn DocumentStore>> {
        self.inner.store.read().await.as_ref().cloned()
    }

    /// Current store, or [`ServiceError::Degraded`] when none is installed or the
    /// installed one is flagged unreachable.
    pub async fn require(&self) -> Result<Arc<dyn DocumentStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a store implementation and leave degraded mode.
    pub async fn install(&self, store: Arc<dyn DocumentStore>) {
        {
            let mut guard = self.inner.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear(&self) {
        {
            let mut guard = self.inner.store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Whether the subsystem currently runs without a usable remote store.
    ///
    /// A store can stay installed while flagged degraded, during reconnection attempts.
    pub fn is_degraded(&self) -> bool {
        *self.inner.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.inner.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.inner.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }
}

impl Default for StoreSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::document_store::memory::InMemoryDocumentStore;

    #[tokio::test]
    async fn empty_slot_is_degraded() {
        let slot = StoreSlot::new();
        assert!(slot.is_degraded());
        assert!(matches!(slot.require().await, Err(ServiceError::Degraded)));
    }

    #[tokio::test]
    async fn degraded_flag_fails_fast_with_store_installed() {
        let remote = InMemoryDocumentStore::new();
        let slot = StoreSlot::with_store(Arc::new(remote.clone()));
        assert!(slot.require().await.is_ok());

        slot.update_degraded(true);
        assert!(slot.store().await.is_some());
        assert!(matches!(slot.require().await, Err(ServiceError::Degraded)));

        slot.update_degraded(false);
        assert!(slot.require().await.is_ok());
    }

    #[tokio::test]
    async fn install_and_clear_toggle_degraded_flag() {
        let slot = StoreSlot::new();
        let mut watcher = slot.degraded_watcher();

        slot.install(Arc::new(InMemoryDocumentStore::new())).await;
        assert!(!slot.is_degraded());
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());

        slot.clear().await;
        assert!(slot.is_degraded());
        assert!(slot.store().await.is_none());
    }
}
