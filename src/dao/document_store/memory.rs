//! Process-local document store used when no database is configured and by tests.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    time::{Duration, SystemTime},
};

use dashmap::DashMap;
use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    document_store::{CompletionStore, DocumentStore, SettingsStore},
    models::{CompletionEntity, GameId, Settings},
    storage::{StorageError, StorageResult},
};

/// Failure simulated by the in-memory store.
#[derive(Debug, Error)]
pub enum MemoryStoreError {
    /// The store was switched offline.
    #[error("in-memory store is offline")]
    Offline,
}

impl From<MemoryStoreError> for StorageError {
    fn from(err: MemoryStoreError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}

/// Document store keeping completion records and settings in memory.
///
/// Records get random document ids, mirroring auto-generated ids of hosted document
/// databases; a username index maps each user to their single record.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    completions: DashMap<Uuid, CompletionEntity>,
    ids: DashMap<String, Uuid>,
    settings: RwLock<Option<Settings>>,
    offline: AtomicBool,
    user_reads: AtomicUsize,
    read_delay_ms: AtomicU64,
}

impl InMemoryDocumentStore {
    /// Empty, online store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated connectivity. While offline every operation fails.
    pub fn set_online(&self, online: bool) {
        self.inner.offline.store(!online, Ordering::SeqCst);
    }

    /// Hold every per-user lookup for `delay` after its snapshot is taken, so the
    /// answer can go stale while it travels back.
    pub fn set_read_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.inner.read_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Number of per-user completion lookups served so far.
    pub fn user_reads(&self) -> usize {
        self.inner.user_reads.load(Ordering::SeqCst)
    }

    fn ensure_online(&self) -> Result<(), MemoryStoreError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            Err(MemoryStoreError::Offline)
        } else {
            Ok(())
        }
    }

    fn document_id(&self, username: &str) -> Option<Uuid> {
        self.inner.ids.get(username).map(|id| *id)
    }

    fn update_existing<F>(&self, username: &str, update: F)
    where
        F: FnOnce(&mut CompletionEntity),
    {
        let Some(id) = self.document_id(username) else {
            return;
        };
        if let Some(mut record) = self.inner.completions.get_mut(&id) {
            update(&mut record);
            record.updated_at = Some(SystemTime::now());
        }
    }
}

impl CompletionStore for InMemoryDocumentStore {
    fn list_completions(&self) -> BoxFuture<'static, StorageResult<Vec<CompletionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            Ok(store
                .inner
                .completions
                .iter()
                .map(|entry| entry.value().clone())
                .collect())
        })
    }

    fn find_completions(
        &self,
        username: String,
    ) -> BoxFuture<'static, StorageResult<Option<CompletionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            let record = store
                .document_id(&username)
                .and_then(|id| store.inner.completions.get(&id).map(|r| r.clone()));
            store.inner.user_reads.fetch_add(1, Ordering::SeqCst);
            let delay = store.inner.read_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Ok(record)
        })
    }

    fn mark_completed(
        &self,
        username: String,
        game_id: GameId,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            // The id is claimed under the index lock, so racing writers share one record.
            let id = *store
                .inner
                .ids
                .entry(username.clone())
                .or_insert_with(Uuid::new_v4);
            store
                .inner
                .completions
                .entry(id)
                .and_modify(|record| {
                    record.completions.insert(game_id, true);
                    record.updated_at = Some(SystemTime::now());
                })
                .or_insert_with(|| {
                    CompletionEntity::new(username, [(game_id, true)], Some(SystemTime::now()))
                });
            Ok(())
        })
    }

    fn reset_completion(
        &self,
        username: String,
        game_id: GameId,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            store.update_existing(&username, |record| {
                record.completions.remove(&game_id);
            });
            Ok(())
        })
    }

    fn reset_all(&self, username: String) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            store.update_existing(&username, |record| record.completions.clear());
            Ok(())
        })
    }
}

impl SettingsStore for InMemoryDocumentStore {
    fn load_settings(&self) -> BoxFuture<'static, StorageResult<Option<Settings>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            Ok(*store.inner.settings.read().await)
        })
    }

    fn save_settings(&self, settings: Settings) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            *store.inner.settings.write().await = Some(settings);
            Ok(())
        })
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online().map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.health_check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> GameId {
        GameId::new(raw).unwrap()
    }

    #[tokio::test]
    async fn mark_creates_record_once() {
        let store = InMemoryDocumentStore::new();
        store.mark_completed("alice".into(), id(4)).await.unwrap();
        store.mark_completed("alice".into(), id(4)).await.unwrap();

        let all = store.list_completions().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].completions.len(), 1);
        assert!(all[0].updated_at.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_marks_share_one_record() {
        let store = InMemoryDocumentStore::new();
        let writers: Vec<_> = (1..=8)
            .map(|raw| {
                let store = store.clone();
                tokio::spawn(async move { store.mark_completed("alice".into(), id(raw)).await })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        let all = store.list_completions().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].completions.len(), 8);
    }

    #[tokio::test]
    async fn reset_on_missing_user_is_a_no_op() {
        let store = InMemoryDocumentStore::new();
        store.reset_completion("bob".into(), id(1)).await.unwrap();
        store.reset_all("bob".into()).await.unwrap();
        assert!(store.find_completions("bob".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reset_all_keeps_the_record() {
        let store = InMemoryDocumentStore::new();
        store.mark_completed("alice".into(), id(1)).await.unwrap();
        store.mark_completed("alice".into(), id(2)).await.unwrap();
        store.reset_all("alice".into()).await.unwrap();

        let record = store.find_completions("alice".into()).await.unwrap().unwrap();
        assert!(record.completions.is_empty());
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = InMemoryDocumentStore::new();
        store.set_online(false);
        assert!(store.health_check().await.is_err());
        assert!(store.load_settings().await.is_err());
        assert!(store.mark_completed("alice".into(), id(1)).await.is_err());

        store.set_online(true);
        assert!(store.health_check().await.is_ok());
    }
}
