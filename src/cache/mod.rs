//! Durable local key/value cache holding JSON blobs under well-known keys.
//!
//! The cache is a disposable projection of the remote stores: reads never fail (a
//! missing or corrupt slot yields the caller's default) and writes report success as
//! a boolean after logging the cause of any failure.

pub mod file;
pub mod memory;

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::warn;

pub use file::FileCacheBackend;
pub use memory::MemoryCacheBackend;

/// Completion flags of every user seen on this device, keyed by username.
pub const COMPLETIONS_KEY: &str = "gameCompletions";
/// Last settings read from or written to the remote store.
pub const SETTINGS_KEY: &str = "settings";
/// Current session blob (`username` + `token`).
pub const SESSION_KEY: &str = "authInfo";

/// Result alias for raw backend operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Failures of a cache backend. They never escape [`LocalCache`].
#[derive(Debug, Error)]
pub enum CacheError {
    /// Keys may only hold ASCII alphanumerics, `_` and `-`.
    #[error("cache key `{key}` is not a plain identifier")]
    InvalidKey {
        /// Rejected key.
        key: String,
    },
    /// The backend could not read or write the slot.
    #[error("cache i/o failed for `{key}`")]
    Io {
        /// Slot being accessed.
        key: String,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// The value could not be turned into JSON.
    #[error("failed to serialize cache value for `{key}`")]
    Serialize {
        /// Slot being written.
        key: String,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Raw text slots addressed by key.
pub trait CacheBackend: Send + Sync {
    /// Raw slot content, `None` when the key was never written.
    fn read(&self, key: &str) -> CacheResult<Option<String>>;
    /// Replace the slot content.
    fn write(&self, key: &str, value: &str) -> CacheResult<()>;
    /// Drop the slot. Deleting a missing key succeeds.
    fn delete(&self, key: &str) -> CacheResult<()>;
}

/// Keys are used as file names by the durable backend.
pub(crate) fn validate_key(key: &str) -> CacheResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidKey {
            key: key.to_owned(),
        })
    }
}

/// JSON view over a [`CacheBackend`].
#[derive(Clone)]
pub struct LocalCache {
    backend: Arc<dyn CacheBackend>,
}

impl LocalCache {
    /// Wrap a storage backend.
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Cache that lives as long as the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheBackend::new()))
    }

    /// Serialize `value` and store it under `key`, returning whether it was persisted.
    pub fn save<T>(&self, key: &str, value: &T) -> bool
    where
        T: ?Sized + Serialize,
    {
        let result = serde_json::to_string(value)
            .map_err(|source| CacheError::Serialize {
                key: key.to_owned(),
                source,
            })
            .and_then(|text| self.backend.write(key, &text));

        match result {
            Ok(()) => true,
            Err(err) => {
                warn!(key, error = %err, "failed to save cache entry");
                false
            }
        }
    }

    /// Read and deserialize `key`, falling back to `default` when absent or unreadable.
    pub fn get<T>(&self, key: &str, default: T) -> T
    where
        T: DeserializeOwned,
    {
        let text = match self.backend.read(key) {
            Ok(Some(text)) => text,
            Ok(None) => return default,
            Err(err) => {
                warn!(key, error = %err, "failed to read cache entry");
                return default;
            }
        };

        match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "ignoring malformed cache entry");
                default
            }
        }
    }

    /// Like [`LocalCache::get`] with `T::default()` as fallback.
    pub fn get_or_default<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        self.get(key, T::default())
    }

    /// Delete `key`; a missing key is not an error.
    pub fn remove(&self, key: &str) {
        if let Err(err) = self.backend.delete(key) {
            warn!(key, error = %err, "failed to remove cache entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn save_then_get_returns_value() {
        let cache = LocalCache::in_memory();
        assert!(cache.save("answer", &42u32));
        assert_eq!(cache.get("answer", 0u32), 42);
    }

    #[test]
    fn missing_key_returns_default() {
        let cache = LocalCache::in_memory();
        assert_eq!(cache.get("missing", 7u32), 7);
        let map: BTreeMap<String, bool> = cache.get_or_default("missing");
        assert!(map.is_empty());
    }

    #[test]
    fn corrupt_json_reads_as_default() {
        let backend = Arc::new(MemoryCacheBackend::new());
        backend.write("settings", "{not json").unwrap();
        let cache = LocalCache::new(backend);
        assert_eq!(cache.get("settings", 3u8), 3);
    }

    #[test]
    fn wrong_shape_reads_as_default() {
        let cache = LocalCache::in_memory();
        assert!(cache.save("value", "text"));
        assert_eq!(cache.get("value", 5u32), 5);
    }

    #[test]
    fn invalid_key_is_rejected_without_panicking() {
        let cache = LocalCache::in_memory();
        assert!(!cache.save("../escape", &1u8));
        assert_eq!(cache.get("../escape", 0u8), 0);
        cache.remove("../escape");
    }

    #[test]
    fn remove_deletes_the_slot() {
        let cache = LocalCache::in_memory();
        cache.save("gone", &true);
        cache.remove("gone");
        assert!(!cache.get("gone", false));
    }
}
