//! In-memory cache backend.

use dashmap::DashMap;

use super::{CacheBackend, CacheResult, validate_key};

/// Volatile backend used for tests and for runs without a cache directory.
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    slots: DashMap<String, String>,
}

impl MemoryCacheBackend {
    /// Empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheBackend for MemoryCacheBackend {
    fn read(&self, key: &str) -> CacheResult<Option<String>> {
        validate_key(key)?;
        Ok(self.slots.get(key).map(|slot| slot.value().clone()))
    }

    fn write(&self, key: &str, value: &str) -> CacheResult<()> {
        validate_key(key)?;
        self.slots.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        validate_key(key)?;
        self.slots.remove(key);
        Ok(())
    }
}
