use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::broadcast;
use utoipa::ToSchema;

use crate::dao::models::GameId;

/// Zero-argument hook invoked after the local mirror was repaired.
pub type RefreshCallback = Arc<dyn Fn() + Send + Sync>;

/// A completion flag of the local mirror that was overwritten with the remote value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionCorrected {
    /// Owner of the flag.
    pub username: String,
    /// Corrected game.
    pub game_id: GameId,
    /// Value now stored locally, as reported by the remote store.
    pub completed: bool,
}

/// Fan-out point for completion corrections: one replaceable callback plus a
/// broadcast channel feeding the SSE stream.
pub struct RefreshHub {
    sender: broadcast::Sender<CompletionCorrected>,
    callback: Mutex<Option<RefreshCallback>>,
}

impl RefreshHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self {
            sender,
            callback: Mutex::new(None),
        }
    }

    /// Register a new subscriber that will receive subsequent corrections.
    pub fn subscribe(&self) -> broadcast::Receiver<CompletionCorrected> {
        self.sender.subscribe()
    }

    /// Register the refresh callback, replacing any previous one.
    pub fn set_callback(&self, callback: RefreshCallback) {
        let mut guard = self.callback.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(callback);
    }

    /// Broadcast `corrections` and invoke the callback once. No-op when empty.
    pub fn publish(&self, corrections: &[CompletionCorrected]) {
        if corrections.is_empty() {
            return;
        }
        for correction in corrections {
            // No receivers is fine.
            let _ = self.sender.send(correction.clone());
        }

        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}
