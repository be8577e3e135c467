//! Global settings resolution: remote document, then local mirror, then defaults.

use std::{fmt, sync::Arc, time::Duration};

use thiserror::Error;
use tracing::{debug, info};
use validator::Validate;

use crate::{
    cache::{LocalCache, SETTINGS_KEY},
    dao::{models::Settings, storage::StorageError},
    error::ServiceError,
    services::auth::{SessionProvider, require_credential},
    state::StoreSlot,
};

/// Where a settings value may come from, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsProvider {
    /// The shared settings document of the remote store.
    Remote,
    /// Last settings mirrored in the local cache.
    Cache,
    /// Built-in values.
    Defaults,
}

impl SettingsProvider {
    /// Lookup order used by [`SettingsService::get_settings`].
    pub const CHAIN: [SettingsProvider; 3] = [
        SettingsProvider::Remote,
        SettingsProvider::Cache,
        SettingsProvider::Defaults,
    ];

    /// Lowercase name used in responses and logs.
    pub fn name(self) -> &'static str {
        match self {
            SettingsProvider::Remote => "remote",
            SettingsProvider::Cache => "cache",
            SettingsProvider::Defaults => "defaults",
        }
    }
}

impl fmt::Display for SettingsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a provider produced no settings.
#[derive(Debug, Error)]
pub enum SettingsMiss {
    /// The provider answered but holds no settings.
    #[error("no settings stored")]
    Absent,
    /// The provider could not be asked.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    /// The stored value failed validation.
    #[error("stored settings are invalid: {0}")]
    Malformed(String),
}

impl From<StorageError> for SettingsMiss {
    fn from(err: StorageError) -> Self {
        SettingsMiss::Unavailable(err.to_string())
    }
}

/// Settings resolved by [`SettingsService::resolve`] along with their origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSettings {
    /// Values in effect.
    pub settings: Settings,
    /// Provider that answered.
    pub provider: SettingsProvider,
}

/// Reads and writes the global settings, mirroring them in the local cache.
#[derive(Clone)]
pub struct SettingsService {
    store: StoreSlot,
    cache: LocalCache,
    session: Arc<dyn SessionProvider>,
    credential_wait: Duration,
}

impl SettingsService {
    /// Service over `store`, mirroring into `cache`.
    pub fn new(
        store: StoreSlot,
        cache: LocalCache,
        session: Arc<dyn SessionProvider>,
        credential_wait: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            session,
            credential_wait,
        }
    }

    /// Current settings. Never fails: the defaults provider always answers.
    pub async fn get_settings(&self) -> Settings {
        self.resolve().await.settings
    }

    /// Walk the provider chain and report which provider answered.
    ///
    /// A reachable remote without a settings document is authoritative: the defaults
    /// apply and the local mirror is skipped. Only unreachable or invalid remote
    /// answers fall through to the mirror.
    pub async fn resolve(&self) -> ResolvedSettings {
        for provider in SettingsProvider::CHAIN {
            match self.lookup(provider).await {
                Ok(settings) => {
                    if provider == SettingsProvider::Remote {
                        self.cache.save(SETTINGS_KEY, &settings);
                    }
                    return ResolvedSettings { settings, provider };
                }
                Err(SettingsMiss::Absent) if provider == SettingsProvider::Remote => {
                    debug!("no remote settings document; using defaults");
                    break;
                }
                Err(miss) => debug!(provider = provider.name(), reason = %miss, "settings miss"),
            }
        }

        ResolvedSettings {
            settings: Self::get_default_settings(),
            provider: SettingsProvider::Defaults,
        }
    }

    /// Ask a single provider for the settings.
    pub async fn lookup(&self, provider: SettingsProvider) -> Result<Settings, SettingsMiss> {
        let settings = match provider {
            SettingsProvider::Remote => {
                let store = self
                    .store
                    .require()
                    .await
                    .map_err(|err| SettingsMiss::Unavailable(err.to_string()))?;
                store.load_settings().await?.ok_or(SettingsMiss::Absent)?
            }
            SettingsProvider::Cache => self
                .cache
                .get::<Option<Settings>>(SETTINGS_KEY, None)
                .ok_or(SettingsMiss::Absent)?,
            SettingsProvider::Defaults => return Ok(Self::get_default_settings()),
        };

        settings
            .validate()
            .map_err(|err| SettingsMiss::Malformed(err.to_string()))?;
        Ok(settings)
    }

    /// Replace the remote settings document and refresh the local mirror.
    pub async fn update_settings(&self, settings: Settings) -> Result<Settings, ServiceError> {
        settings.validate()?;
        require_credential(self.session.as_ref(), self.credential_wait).await?;
        let store = self.store.require().await?;
        store.save_settings(settings).await?;
        self.cache.save(SETTINGS_KEY, &settings);
        info!(?settings, "settings updated");
        Ok(settings)
    }

    /// Built-in settings, independent of any provider.
pub fn get_default_settings() -> Settings {
        Settings::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::document_store::{SettingsStore, memory::InMemoryDocumentStore},
        services::auth::CachedSession,
    };

    struct Fixture {
        service: SettingsService,
        remote: InMemoryDocumentStore,
        cache: LocalCache,
        slot: StoreSlot,
    }

    fn fixture(signed_in: bool) -> Fixture {
        let remote = InMemoryDocumentStore::new();
        let cache = LocalCache::in_memory();
        let session = CachedSession::new(cache.clone());
        if signed_in {
            session.sign_in("admin", "token");
        }
        let slot = StoreSlot::with_store(Arc::new(remote.clone()));
        let service = SettingsService::new(
            slot.clone(),
            cache.clone(),
            Arc::new(session),
            Duration::from_millis(10),
        );
        Fixture {
            service,
            remote,
            cache,
            slot,
        }
    }

    fn custom() -> Settings {
        Settings {
            questions_to_use: 10,
            time_limit: 30,
            completion_threshold: 70,
            enable_confetti: false,
        }
    }

    #[tokio::test]
    async fn nothing_stored_yields_defaults() {
        let fx = fixture(false);
        let resolved = fx.service.resolve().await;
        assert_eq!(resolved.settings, Settings::default());
        assert_eq!(resolved.provider, SettingsProvider::Defaults);
    }

    #[tokio::test]
    async fn remote_hit_refreshes_the_mirror() {
        let fx = fixture(false);
        fx.remote.save_settings(custom()).await.unwrap();

        let resolved = fx.service.resolve().await;
        assert_eq!(resolved.provider, SettingsProvider::Remote);
        assert_eq!(fx.cache.get::<Option<Settings>>(SETTINGS_KEY, None), Some(custom()));
    }

    #[tokio::test]
    async fn offline_remote_falls_back_to_cache_then_defaults() {
        let fx = fixture(false);
        fx.remote.set_online(false);
        assert_eq!(fx.service.get_settings().await, Settings::default());

        fx.cache.save(SETTINGS_KEY, &custom());
        let resolved = fx.service.resolve().await;
        assert_eq!(resolved.provider, SettingsProvider::Cache);
        assert_eq!(resolved.settings, custom());
    }

    #[tokio::test]
    async fn reachable_remote_without_document_ignores_the_mirror() {
        let fx = fixture(false);
        let stale = Settings {
            completion_threshold: 10,
            ..Settings::default()
        };
        fx.cache.save(SETTINGS_KEY, &stale);

        let resolved = fx.service.resolve().await;
        assert_eq!(resolved.settings, Settings::default());
        assert_eq!(resolved.provider, SettingsProvider::Defaults);
    }

    #[tokio::test]
    async fn degraded_remote_is_skipped_without_a_call() {
        let fx = fixture(false);
        fx.remote.save_settings(custom()).await.unwrap();
        fx.cache.save(SETTINGS_KEY, &custom());
        fx.slot.update_degraded(true);

        assert!(matches!(
            fx.service.lookup(SettingsProvider::Remote).await,
            Err(SettingsMiss::Unavailable(_))
        ));
        let resolved = fx.service.resolve().await;
        assert_eq!(resolved.provider, SettingsProvider::Cache);
    }

    #[tokio::test]
    async fn invalid_remote_document_is_skipped() {
        let fx = fixture(false);
        let broken = Settings {
            questions_to_use: 0,
            ..Settings::default()
        };
        fx.remote.save_settings(broken).await.unwrap();

        assert!(matches!(
            fx.service.lookup(SettingsProvider::Remote).await,
            Err(SettingsMiss::Malformed(_))
        ));
        assert_eq!(fx.service.get_settings().await, Settings::default());
    }

    #[tokio::test]
    async fn update_replaces_remote_and_mirror() {
        let fx = fixture(true);
        let saved = fx.service.update_settings(custom()).await.unwrap();
        assert_eq!(saved, custom());
        assert_eq!(fx.remote.load_settings().await.unwrap(), Some(custom()));
        assert_eq!(fx.cache.get::<Option<Settings>>(SETTINGS_KEY, None), Some(custom()));
    }

    #[tokio::test]
    async fn out_of_range_update_is_rejected() {
        let fx = fixture(true);
        let invalid = Settings {
            completion_threshold: 101,
            ..Settings::default()
        };
        assert!(matches!(
            fx.service.update_settings(invalid).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert_eq!(fx.remote.load_settings().await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_without_session_is_unauthorized() {
        let fx = fixture(false);
        assert!(matches!(
            fx.service.update_settings(custom()).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
