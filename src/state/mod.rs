mod refresh;
mod store;

use std::sync::Arc;

use crate::{
    cache::LocalCache,
    catalog::GameCatalog,
    config::AppConfig,
    services::{
        auth::CachedSession, completion_service::CompletionService,
        reconciliation::CompletionTracker, settings_service::SettingsService,
    },
};

pub use self::refresh::{CompletionCorrected, RefreshCallback, RefreshHub};
pub use self::store::StoreSlot;

/// [`AppState`] shared between handlers and background tasks.
pub type SharedState = Arc<AppState>;

/// Central application state: the explicitly wired services sharing one store slot
/// and one local cache.
pub struct AppState {
    config: AppConfig,
    store: StoreSlot,
    session: CachedSession,
    completions: CompletionService,
    settings: SettingsService,
    tracker: CompletionTracker,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, cache: LocalCache) -> SharedState {
        Self::with_store(config, cache, StoreSlot::new())
    }

    /// Build the state around an existing store slot.
    pub fn with_store(config: AppConfig, cache: LocalCache, store: StoreSlot) -> SharedState {
        let session = CachedSession::new(cache.clone());
        let provider = Arc::new(session.clone());
        let wait = config.credential_wait();

        let completions = CompletionService::new(store.clone(), provider.clone(), wait);
        let settings = SettingsService::new(store.clone(), cache.clone(), provider, wait);
        let tracker = CompletionTracker::new(cache, completions.clone());

        Arc::new(Self {
            config,
            store,
            session,
            completions,
            settings,
            tracker,
        })
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Shortcut for the configured catalog.
    pub fn catalog(&self) -> &GameCatalog {
        self.config.catalog()
    }

    /// Slot holding the remote store, driven by the storage supervisor.
    pub fn store(&self) -> &StoreSlot {
        &self.store
    }

    /// Whether the remote store is currently unusable.
    pub fn is_degraded(&self) -> bool {
        self.store.is_degraded()
    }

    /// Session of this device.
    pub fn session(&self) -> &CachedSession {
        &self.session
    }

    /// Remote completion facade.
    pub fn completions(&self) -> &CompletionService {
        &self.completions
    }

    /// Settings provider chain.
    pub fn settings(&self) -> &SettingsService {
        &self.settings
    }

    /// Optimistic completion tracker over the local mirror.
    pub fn tracker(&self) -> &CompletionTracker {
        &self.tracker
    }
}
