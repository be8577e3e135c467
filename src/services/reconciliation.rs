//! Optimistic completion tracking.
//!
//! Queries are answered from the local mirror right away. The remote store is then
//! consulted in the background; when it disagrees, the mirror is overwritten with
//! the remote value and a refresh is signalled. Remote failures never alter the
//! mirror.

use std::{collections::BTreeMap, sync::Arc};

use dashmap::DashMap;
use tokio::{runtime::Handle, sync::broadcast, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    cache::{COMPLETIONS_KEY, LocalCache},
    dao::models::{CompletionMap, GameId, Settings},
    error::ServiceError,
    policy::{GameResult, ScoreTier},
    services::completion_service::CompletionService,
    state::{CompletionCorrected, RefreshHub},
};

const REFRESH_CAPACITY: usize = 64;

/// Mirror blob stored under [`COMPLETIONS_KEY`].
type Mirror = BTreeMap<String, CompletionMap>;

/// Handle on a remote write started by [`CompletionTracker::mark_completed`].
///
/// Dropping it leaves the write running.
pub struct PendingWrite {
    handle: Option<JoinHandle<Result<(), ServiceError>>>,
}

impl PendingWrite {
    /// Wait for the remote write and report its outcome.
    pub async fn outcome(self) -> Result<(), ServiceError> {
        let Some(handle) = self.handle else {
            return Err(ServiceError::Task("no async runtime to run the write".into()));
        };
        handle
            .await
            .map_err(|err| ServiceError::Task(err.to_string()))?
    }

    /// Wait for the remote write; `true` when it was persisted.
    pub async fn settled(self) -> bool {
        self.outcome().await.is_ok()
    }
}

/// Result of [`CompletionTracker::record_game_result`].
pub struct RecordOutcome {
    /// Validated result.
    pub result: GameResult,
    /// Grade of the result.
    pub tier: ScoreTier,
    /// Whether the score reached the completion threshold.
    pub qualified: bool,
    /// Remote write, present only when the game was marked completed.
    pub pending: Option<PendingWrite>,
}

/// Reconciliation engine between the local mirror and the remote completion store.
#[derive(Clone)]
pub struct CompletionTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    cache: LocalCache,
    completions: CompletionService,
    refresh: RefreshHub,
    writes: DashMap<String, WriteState>,
}

/// Local writes and remote reads in progress for one user. A reconciliation whose
/// remote read overlapped a write could undo it, so such reads are discarded.
///
/// The entry is dropped once nothing is in progress.
#[derive(Debug, Default, Clone, Copy)]
struct WriteState {
    in_flight: usize,
    readers: usize,
    epoch: u64,
}

impl WriteState {
    fn idle(&self) -> bool {
        self.in_flight == 0 && self.readers == 0
    }

    fn overlaps(&self, earlier: &WriteState) -> bool {
        self.epoch != earlier.epoch || self.in_flight > 0 || earlier.in_flight > 0
    }
}

impl CompletionTracker {
    /// Tracker mirroring `completions` into `cache`.
    pub fn new(cache: LocalCache, completions: CompletionService) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                cache,
                completions,
                refresh: RefreshHub::new(REFRESH_CAPACITY),
                writes: DashMap::new(),
            }),
        }
    }

    /// Register the refresh callback, replacing any previous one.
    pub fn on_refresh<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.refresh.set_callback(Arc::new(callback));
    }

    /// Receive every correction applied to the mirror from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CompletionCorrected> {
        self.inner.refresh.subscribe()
    }

    /// Locally known completions of `username`.
    pub fn completed_games(&self, username: &str) -> CompletionMap {
        let mut mirror = self.load_mirror();
        let mut games = mirror.remove(username).unwrap_or_default();
        games.retain(|_, done| *done);
        games
    }

    /// Local answer, returned before the remote check scheduled for the same game.
    pub fn is_completed(&self, username: &str, game_id: GameId) -> bool {
        let completed = self.completed_games(username).contains_key(&game_id);
        self.reconcile_in_background(username, vec![game_id]);
        completed
    }

    /// Whether every game of `ids` is locally completed; `true` for an empty list.
    ///
    /// A single remote read checks all of them in the background.
    pub fn are_all_completed(&self, username: &str, ids: &[GameId]) -> bool {
        let games = self.completed_games(username);
        let all = ids.iter().all(|id| games.contains_key(id));
        if !ids.is_empty() {
            self.reconcile_in_background(username, ids.to_vec());
        }
        all
    }

    /// Record the completion locally, then write it remotely in the background.
    ///
    /// A failed remote write is logged and the local flag kept.
    pub fn mark_completed(&self, username: &str, game_id: GameId) -> PendingWrite {
        self.update_user(username, |games| {
            games.insert(game_id, true);
        });

        let Ok(runtime) = Handle::try_current() else {
            warn!(username, %game_id, "no async runtime; completion kept locally only");
            self.bump_epoch(username);
            return PendingWrite { handle: None };
        };

        self.begin_write(username);
        let tracker = self.clone();
        let username = username.to_owned();
        let handle = runtime.spawn(async move {
            let result = tracker
                .inner
                .completions
                .try_mark_game_completed(&username, game_id)
                .await;
            tracker.end_write(&username);
            if let Err(err) = &result {
                warn!(username, %game_id, error = %err, "remote completion write failed");
            }
            result
        });

        PendingWrite {
            handle: Some(handle),
        }
    }

    /// Compare `ids` with the remote map and repair the mirror where they differ.
    pub async fn reconcile(
        &self,
        username: &str,
        ids: &[GameId],
    ) -> Result<Vec<CompletionCorrected>, ServiceError> {
        let Some(remote) = self.read_remote(username).await? else {
            return Ok(Vec::new());
        };

        let mut corrections = Vec::new();
        self.update_user(username, |games| {
            for &game_id in ids {
                let remote_done = remote.get(&game_id).copied().unwrap_or(false);
                let local_done = games.get(&game_id).copied().unwrap_or(false);
                if remote_done == local_done {
                    continue;
                }
                if remote_done {
                    games.insert(game_id, true);
                } else {
                    games.remove(&game_id);
                }
                corrections.push(CompletionCorrected {
                    username: username.to_owned(),
                    game_id,
                    completed: remote_done,
                });
            }
        });

        self.announce(&corrections);
        Ok(corrections)
    }

    /// Replace the whole mirror of `username` with the remote map.
    pub async fn sync_user(
        &self,
        username: &str,
    ) -> Result<Vec<CompletionCorrected>, ServiceError> {
        let Some(remote) = self.read_remote(username).await? else {
            return Ok(Vec::new());
        };

        let mut corrections = Vec::new();
        self.update_user(username, |games| {
            let local = std::mem::take(games);
            for (&game_id, _) in local.iter().filter(|(_, done)| **done) {
                if !remote.contains_key(&game_id) {
                    corrections.push(CompletionCorrected {
                        username: username.to_owned(),
                        game_id,
                        completed: false,
                    });
                }
            }
            for &game_id in remote.keys() {
                if local.get(&game_id) != Some(&true) {
                    corrections.push(CompletionCorrected {
                        username: username.to_owned(),
                        game_id,
                        completed: true,
                    });
                }
            }
            *games = remote.clone();
        });

        self.announce(&corrections);
        Ok(corrections)
    }

    /// Remove one completion remotely, then locally.
    pub async fn reset_game_completion(
        &self,
        username: &str,
        game_id: GameId,
    ) -> Result<(), ServiceError> {
        self.begin_write(username);
        let result = self
            .inner
            .completions
            .try_reset_game_completion(username, game_id)
            .await;
        if result.is_ok() {
            self.update_user(username, |games| {
                games.remove(&game_id);
            });
        }
        self.end_write(username);
        result
    }

    /// Remove every completion of `username` remotely, then locally.
    pub async fn reset_all_completions(&self, username: &str) -> Result<(), ServiceError> {
        self.begin_write(username);
        let result = self
            .inner
            .completions
            .try_reset_all_completions(username)
            .await;
        if result.is_ok() {
            self.update_user(username, CompletionMap::clear);
        }
        self.end_write(username);
        result
    }

    /// Apply the completion policy to a finished game and mark it when it qualifies.
    pub fn record_game_result(
        &self,
        username: &str,
        game_id: GameId,
        result: GameResult,
        settings: &Settings,
    ) -> RecordOutcome {
        let qualified = result.qualifies(settings);
        info!(
            username,
            %game_id,
            score = result.score(),
            total = result.total_questions(),
            threshold = settings.completion_threshold,
            qualified,
            "game result recorded"
        );
        let pending = qualified.then(|| self.mark_completed(username, game_id));
        RecordOutcome {
            result,
            tier: result.tier(),
            qualified,
            pending,
        }
    }

    /// Spawn [`CompletionTracker::reconcile`] on the current runtime, if any.
    pub fn reconcile_in_background(&self, username: &str, ids: Vec<GameId>) {
        let Ok(runtime) = Handle::try_current() else {
            debug!(username, "no async runtime; skipping background reconciliation");
            return;
        };

        let tracker = self.clone();
        let username = username.to_owned();
        runtime.spawn(async move {
            if let Err(err) = tracker.reconcile(&username, &ids).await {
                debug!(username, error = %err, "reconciliation skipped");
            }
        });
    }

    /// Remote map of `username`, or `None` when a local write overlapped the read.
    async fn read_remote(&self, username: &str) -> Result<Option<CompletionMap>, ServiceError> {
        let before = self.begin_read(username);
        let remote = self
            .inner
            .completions
            .try_get_user_completions(username)
            .await;
        let after = self.end_read(username);
        let remote = remote?;

        if after.overlaps(&before) {
            debug!(username, "local write in flight; discarding remote read");
            return Ok(None);
        }
        Ok(Some(remote))
    }

    fn begin_read(&self, username: &str) -> WriteState {
        let mut state = self.inner.writes.entry(username.to_owned()).or_default();
        state.readers += 1;
        *state
    }

    /// State seen by the finishing read.
    fn end_read(&self, username: &str) -> WriteState {
        let seen = self
            .inner
            .writes
            .get_mut(username)
            .map(|mut state| {
                state.readers = state.readers.saturating_sub(1);
                *state
            })
            .unwrap_or_default();
        self.release(username);
        seen
    }

    fn begin_write(&self, username: &str) {
        let mut state = self.inner.writes.entry(username.to_owned()).or_default();
        state.in_flight += 1;
        state.epoch += 1;
    }

    fn end_write(&self, username: &str) {
        if let Some(mut state) = self.inner.writes.get_mut(username) {
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.release(username);
    }

    /// Only a read in progress cares about the epoch.
    fn bump_epoch(&self, username: &str) {
        if let Some(mut state) = self.inner.writes.get_mut(username) {
            state.epoch += 1;
        }
    }

    fn release(&self, username: &str) {
        self.inner.writes.remove_if(username, |_, state| state.idle());
    }

    fn announce(&self, corrections: &[CompletionCorrected]) {
        for correction in corrections {
            info!(
                username = correction.username,
                game_id = %correction.game_id,
                completed = correction.completed,
                "local completion corrected from remote"
            );
        }
        self.inner.refresh.publish(corrections);
    }

    fn load_mirror(&self) -> Mirror {
        self.inner.cache.get_or_default(COMPLETIONS_KEY)
    }

    /// Re-read the full blob, edit one user's map and save it back.
    fn update_user<F>(&self, username: &str, change: F)
    where
        F: FnOnce(&mut CompletionMap),
    {
        let mut mirror = self.load_mirror();
        let original = mirror.get(username).cloned();
        let games = mirror.entry(username.to_owned()).or_default();
        games.retain(|_, done| *done);
        change(games);
        if games.is_empty() {
            mirror.remove(username);
        }
        if mirror.get(username) != original.as_ref() {
            self.inner.cache.save(COMPLETIONS_KEY, &mirror);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;
    use crate::{
        dao::document_store::{CompletionStore, memory::InMemoryDocumentStore},
        services::auth::CachedSession,
        state::StoreSlot,
    };

    fn id(raw: u32) -> GameId {
        GameId::new(raw).unwrap()
    }

    fn tracker() -> (CompletionTracker, InMemoryDocumentStore, LocalCache) {
        let remote = InMemoryDocumentStore::new();
        let cache = LocalCache::in_memory();
        let session = CachedSession::new(cache.clone());
        session.sign_in("alice", "token");
        let completions = CompletionService::new(
            StoreSlot::with_store(Arc::new(remote.clone())),
            Arc::new(session),
            Duration::from_millis(10),
        );
        (
            CompletionTracker::new(cache.clone(), completions),
            remote,
            cache,
        )
    }

    #[tokio::test]
    async fn mark_is_visible_immediately_and_persisted() {
        let (tracker, remote, _cache) = tracker();
        let pending = tracker.mark_completed("alice", id(4));
        assert!(tracker.is_completed("alice", id(4)));
        assert!(pending.settled().await);

        let record = remote.find_completions("alice".into()).await.unwrap().unwrap();
        assert_eq!(record.completions.get(&id(4)), Some(&true));
    }

    #[tokio::test]
    async fn failed_remote_write_keeps_local_flag() {
        let (tracker, remote, _cache) = tracker();
        remote.set_online(false);
        let pending = tracker.mark_completed("alice", id(4));
        assert!(!pending.settled().await);
        assert!(tracker.completed_games("alice").contains_key(&id(4)));
    }

    #[tokio::test]
    async fn reconcile_adopts_remote_completion_and_fires_callback() {
        let (tracker, remote, _cache) = tracker();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        tracker.on_refresh(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        remote.mark_completed("alice".into(), id(4)).await.unwrap();

        let corrections = tracker.reconcile("alice", &[id(4)]).await.unwrap();
        assert_eq!(
            corrections,
            vec![CompletionCorrected {
                username: "alice".into(),
                game_id: id(4),
                completed: true,
            }]
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(tracker.completed_games("alice").contains_key(&id(4)));
    }

    #[tokio::test]
    async fn reconcile_drops_stale_local_completion() {
        let (tracker, remote, _cache) = tracker();
        assert!(tracker.mark_completed("alice", id(4)).settled().await);
        remote.reset_completion("alice".into(), id(4)).await.unwrap();

        let corrections = tracker.reconcile("alice", &[id(4)]).await.unwrap();
        assert_eq!(corrections.len(), 1);
        assert!(!corrections[0].completed);
        assert!(tracker.completed_games("alice").is_empty());
    }

    #[tokio::test]
    async fn agreement_produces_no_refresh() {
        let (tracker, _remote, _cache) = tracker();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        tracker.on_refresh(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(tracker.reconcile("alice", &[id(4)]).await.unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remote_failure_leaves_mirror_untouched() {
        let (tracker, remote, _cache) = tracker();
        assert!(tracker.mark_completed("alice", id(4)).settled().await);
        remote.set_online(false);

        assert!(tracker.reconcile("alice", &[id(4), id(10)]).await.is_err());
        assert!(tracker.completed_games("alice").contains_key(&id(4)));
    }

    #[tokio::test]
    async fn sync_user_replaces_the_local_map() {
        let (tracker, remote, _cache) = tracker();
        assert!(tracker.mark_completed("alice", id(1)).settled().await);
        remote.reset_all("alice".into()).await.unwrap();
        remote.mark_completed("alice".into(), id(10)).await.unwrap();

        let mut corrections = tracker.sync_user("alice").await.unwrap();
        corrections.sort_by_key(|c| c.game_id);
        assert_eq!(corrections.len(), 2);
        assert_eq!((corrections[0].game_id, corrections[0].completed), (id(1), false));
        assert_eq!((corrections[1].game_id, corrections[1].completed), (id(10), true));

        let games = tracker.completed_games("alice");
        assert_eq!(games.keys().copied().collect::<Vec<_>>(), vec![id(10)]);
    }

    #[tokio::test]
    async fn empty_id_list_is_vacuously_complete() {
        let (tracker, remote, _cache) = tracker();
        assert!(tracker.are_all_completed("alice", &[]));
        assert_eq!(remote.user_reads(), 0);
    }

    #[tokio::test]
    async fn resets_update_both_sides() {
        let (tracker, remote, _cache) = tracker();
        assert!(tracker.mark_completed("alice", id(4)).settled().await);
        assert!(tracker.mark_completed("alice", id(10)).settled().await);

        tracker.reset_game_completion("alice", id(4)).await.unwrap();
        assert_eq!(
            tracker.completed_games("alice").keys().copied().collect::<Vec<_>>(),
            vec![id(10)]
        );

        tracker.reset_all_completions("alice").await.unwrap();
        assert!(tracker.completed_games("alice").is_empty());
        let record = remote.find_completions("alice".into()).await.unwrap().unwrap();
        assert!(record.completions.is_empty());
    }

    #[tokio::test]
    async fn failed_reset_keeps_the_mirror() {
        let (tracker, remote, _cache) = tracker();
        assert!(tracker.mark_completed("alice", id(4)).settled().await);
        remote.set_online(false);

        assert!(tracker.reset_game_completion("alice", id(4)).await.is_err());
        assert!(tracker.completed_games("alice").contains_key(&id(4)));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_discards_an_overlapping_remote_read() {
        let (tracker, remote, _cache) = tracker();
        assert!(tracker.mark_completed("alice", id(4)).settled().await);
        let mut corrections = tracker.subscribe();
        remote.set_read_delay(Duration::from_millis(100));

        assert!(tracker.is_completed("alice", id(4)));
        while remote.user_reads() == 0 {
            tokio::task::yield_now().await;
        }
        tracker.reset_game_completion("alice", id(4)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(tracker.completed_games("alice").is_empty());
        assert!(corrections.try_recv().is_err());
    }

    #[tokio::test]
    async fn write_tracking_is_released_once_idle() {
        let (tracker, remote, _cache) = tracker();
        assert!(tracker.mark_completed("alice", id(4)).settled().await);
        tracker.reconcile("alice", &[id(4)]).await.unwrap();
        tracker.reset_all_completions("alice").await.unwrap();
        assert!(tracker.inner.writes.is_empty());

        remote.set_online(false);
        assert!(tracker.reconcile("alice", &[id(4)]).await.is_err());
        assert!(tracker.reset_all_completions("alice").await.is_err());
        assert!(tracker.inner.writes.is_empty());
    }

    #[tokio::test]
    async fn legacy_false_entries_read_as_absent() {
        let (tracker, _remote, cache) = tracker();
        let mut mirror = Mirror::new();
        mirror.insert(
            "alice".into(),
            CompletionMap::from([(id(4), false), (id(10), true)]),
        );
        cache.save(COMPLETIONS_KEY, &mirror);

        let games = tracker.completed_games("alice");
        assert_eq!(games.keys().copied().collect::<Vec<_>>(), vec![id(10)]);
    }

    #[tokio::test]
    async fn qualifying_result_marks_the_game() {
        let (tracker, _remote, _cache) = tracker();
        let settings = Settings::default();

        let miss = tracker.record_game_result(
            "alice",
            id(4),
            GameResult::new(17, 20).unwrap(),
            &settings,
        );
        assert!(!miss.qualified);
        assert!(miss.pending.is_none());
        assert!(tracker.completed_games("alice").is_empty());

        let hit = tracker.record_game_result(
            "alice",
            id(4),
            GameResult::new(18, 20).unwrap(),
            &settings,
        );
        assert!(hit.qualified);
        assert_eq!(hit.tier, ScoreTier::Great);
        assert!(hit.pending.unwrap().settled().await);
        assert!(tracker.completed_games("alice").contains_key(&id(4)));
    }
}
