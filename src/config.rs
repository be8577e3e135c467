//! Application-level configuration loading: game catalog, local cache location and
//! credential wait.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::catalog::{GameCatalog, GameEntry};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PARTY_TRIVIA_CONFIG_PATH";
/// Directory holding the durable local cache when none is configured.
const DEFAULT_CACHE_DIR: &str = "data/cache";
/// How long writes wait for a session credential to show up.
pub const DEFAULT_CREDENTIAL_WAIT: Duration = Duration::from_millis(3_000);

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    catalog: GameCatalog,
    cache_dir: PathBuf,
    credential_wait: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        games = app_config.catalog.len(),
                        cache_dir = %app_config.cache_dir.display(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration document. Omitted fields keep their default.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Games offered on the site.
    pub fn catalog(&self) -> &GameCatalog {
        &self.catalog
    }

    /// Directory of the file-backed local cache.
    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    /// How long remote writes wait for a session credential.
    pub fn credential_wait(&self) -> Duration {
        self.credential_wait
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: GameCatalog::default(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            credential_wait: DEFAULT_CREDENTIAL_WAIT,
        }
    }
}

/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    games: Option<Vec<GameEntry>>,
    #[serde(default)]
    cache_dir: Option<PathBuf>,
    #[serde(default)]
    credential_wait_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            catalog: value
                .games
                .map(GameCatalog::new)
                .unwrap_or(defaults.catalog),
            cache_dir: value.cache_dir.unwrap_or(defaults.cache_dir),
            credential_wait: value
                .credential_wait_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.credential_wait),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
