/// CouchDB backend over its HTTP API.
#[cfg(feature = "couch-store")]
pub mod couchdb;
/// In-process backend.
pub mod memory;
/// MongoDB backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{CompletionEntity, GameId, Settings};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Remote, authoritative record of which games each user completed.
///
/// Records are looked up by equality on their `username` field, never by document id.
pub trait CompletionStore: Send + Sync {
    /// Every completion record known to the backend.
    fn list_completions(&self) -> BoxFuture<'static, StorageResult<Vec<CompletionEntity>>>;
    /// The record owned by `username`, if any.
    fn find_completions(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<CompletionEntity>>>;
    /// Upsert the user's record and set `completions[game_id] = true`.
    fn mark_completed(
        &self,
        username: String,
        game_id: GameId,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete one key from the user's map. Missing records are left alone.
    fn reset_completion(
        &self,
        username: String,
        game_id: GameId,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Replace the user's map with an empty one. Missing records are left alone.
    fn reset_all(&self, username: String) -> BoxFuture<'static, StorageResult<()>>;
}

/// Remote holder of the global settings singleton.
pub trait SettingsStore: Send + Sync {
    /// The stored settings, or `None` when the document was never written.
    fn load_settings(&self) -> BoxFuture<'static, StorageResult<Option<Settings>>>;
    /// Replace the settings document.
    fn save_settings(&self, settings: Settings) -> BoxFuture<'static, StorageResult<()>>;
}

/// A backend able to serve both completions and settings, supervised for health.
pub trait DocumentStore: CompletionStore + SettingsStore {
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
