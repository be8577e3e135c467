use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use party_trivia_back::{
    cache::{COMPLETIONS_KEY, CacheBackend, LocalCache, MemoryCacheBackend},
    config::AppConfig,
    dao::{
        document_store::{CompletionStore, DocumentStore, memory::InMemoryDocumentStore},
        models::{GameId, Settings},
    },
    error::ServiceError,
    services::settings_service::SettingsProvider,
    state::{AppState, SharedState, StoreSlot},
};
use tokio::time::timeout;

struct Fixture {
    state: SharedState,
    remote: InMemoryDocumentStore,
}

fn fixture_with_cache(cache: LocalCache) -> Fixture {
    let remote = InMemoryDocumentStore::new();
    let slot = StoreSlot::with_store(Arc::new(remote.clone()) as Arc<dyn DocumentStore>);
    let state = AppState::with_store(AppConfig::default(), cache, slot);
    Fixture { state, remote }
}

fn signed_in() -> Fixture {
    let fx = fixture_with_cache(LocalCache::in_memory());
    assert!(fx.state.session().sign_in("host", "secret"));
    fx
}

fn game(raw: u32) -> GameId {
    GameId::new(raw).unwrap()
}

#[tokio::test]
async fn remote_completion_reaches_the_mirror_after_one_refresh() {
    let fx = signed_in();
    fx.remote
        .mark_completed("alice".into(), game(4))
        .await
        .unwrap();

    let refreshes = Arc::new(AtomicUsize::new(0));
    let counter = refreshes.clone();
    fx.state.tracker().on_refresh(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let mut corrections = fx.state.tracker().subscribe();

    assert!(!fx.state.tracker().is_completed("alice", game(4)));

    let correction = timeout(Duration::from_secs(1), corrections.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(correction.game_id, game(4));
    assert!(correction.completed);
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);

    assert!(fx.state.tracker().is_completed("alice", game(4)));
}

#[tokio::test]
async fn remote_reset_converges_the_mirror_to_not_completed() {
    let fx = signed_in();
    let tracker = fx.state.tracker();
    tracker.mark_completed("alice", game(10)).outcome().await.unwrap();
    fx.remote
        .reset_completion("alice".into(), game(10))
        .await
        .unwrap();

    let corrections = tracker.reconcile("alice", &[game(10)]).await.unwrap();

    assert_eq!(corrections.len(), 1);
    assert!(!corrections[0].completed);
    assert!(!tracker.completed_games("alice").contains_key(&game(10)));
}

#[tokio::test]
async fn marking_twice_keeps_a_single_flag() {
    let fx = signed_in();
    let tracker = fx.state.tracker();

    tracker.mark_completed("bob", game(12)).outcome().await.unwrap();
    tracker.mark_completed("bob", game(12)).outcome().await.unwrap();

    let remote = fx
        .remote
        .find_completions("bob".into())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(remote.completions.len(), 1);
    assert_eq!(tracker.completed_games("bob").len(), 1);
}

#[tokio::test]
async fn empty_game_list_counts_as_all_completed() {
    let fx = signed_in();
    assert!(fx.state.tracker().are_all_completed("carol", &[]));
    assert_eq!(fx.remote.user_reads(), 0);
}

#[tokio::test]
async fn aggregate_check_reads_the_remote_once() {
    let fx = signed_in();
    let mut corrections = fx.state.tracker().subscribe();
    fx.remote
        .mark_completed("dave".into(), game(4))
        .await
        .unwrap();

    let ids = [game(4), game(10), game(12)];
    assert!(!fx.state.tracker().are_all_completed("dave", &ids));

    timeout(Duration::from_secs(1), corrections.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fx.remote.user_reads(), 1);
}

#[tokio::test]
async fn reset_all_leaves_an_empty_map() {
    let fx = signed_in();
    let tracker = fx.state.tracker();
    for id in [4, 10, 12] {
        tracker.mark_completed("erin", game(id)).outcome().await.unwrap();
    }

    tracker.reset_all_completions("erin").await.unwrap();

    assert!(tracker.completed_games("erin").is_empty());
    let remote = fx
        .remote
        .find_completions("erin".into())
        .await
        .unwrap()
        .unwrap();
    assert!(remote.completions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn writes_without_a_session_keep_the_local_flag_only() {
    let fx = fixture_with_cache(LocalCache::in_memory());
    let tracker = fx.state.tracker();

    let outcome = tracker.mark_completed("frank", game(4)).outcome().await;

    assert!(matches!(outcome, Err(ServiceError::Unauthorized(_))));
    assert!(tracker.completed_games("frank").contains_key(&game(4)));
    assert!(
        fx.remote
            .find_completions("frank".into())
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn settings_fall_back_to_defaults_when_offline() {
    let fx = signed_in();
    fx.remote.set_online(false);

    let resolved = fx.state.settings().resolve().await;

    assert_eq!(resolved.settings, Settings::default());
    assert_eq!(resolved.provider, SettingsProvider::Defaults);
}

#[tokio::test]
async fn saved_settings_survive_going_offline() {
    let fx = signed_in();
    let settings = Settings {
        completion_threshold: 75,
        ..Settings::default()
    };
    fx.state.settings().update_settings(settings).await.unwrap();
    fx.remote.set_online(false);

    let resolved = fx.state.settings().resolve().await;

    assert_eq!(resolved.settings, settings);
    assert_eq!(resolved.provider, SettingsProvider::Cache);
}

#[tokio::test]
async fn out_of_range_settings_are_rejected() {
    let fx = signed_in();
    let settings = Settings {
        completion_threshold: 150,
        ..Settings::default()
    };

    let result = fx.state.settings().update_settings(settings).await;

    assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
}

#[tokio::test]
async fn corrupt_mirror_reads_as_empty() {
    let backend = Arc::new(MemoryCacheBackend::new());
    backend.write(COMPLETIONS_KEY, "{not json").unwrap();
    let fx = fixture_with_cache(LocalCache::new(backend));

    assert!(fx.state.tracker().completed_games("alice").is_empty());
    assert!(fx.state.tracker().are_all_completed("alice", &[]));
}
