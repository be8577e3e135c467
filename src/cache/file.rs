//! File-per-key cache backend.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use super::{CacheBackend, CacheError, CacheResult, validate_key};

/// Durable backend storing each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileCacheBackend {
    dir: PathBuf,
}

impl FileCacheBackend {
    /// Use `dir` as cache root, creating it when needed.
    pub fn open(dir: impl Into<PathBuf>) -> CacheResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| CacheError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Cache root.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> CacheResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn io_error(key: &str) -> impl FnOnce(std::io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        key: key.to_owned(),
        source,
    }
}

impl CacheBackend for FileCacheBackend {
    fn read(&self, key: &str) -> CacheResult<Option<String>> {
        let path = self.slot_path(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(key)(err)),
        }
    }

    /// Writes go through a temporary file so readers never observe half a blob.
    fn write(&self, key: &str, value: &str) -> CacheResult<()> {
        let path = self.slot_path(key)?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value).map_err(io_error(key))?;
        fs::rename(&staging, &path).map_err(io_error(key))
    }

    fn delete(&self, key: &str) -> CacheResult<()> {
        let path = self.slot_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(key)(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::LocalCache;

    #[test]
    fn values_survive_a_new_backend_instance() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(Arc::new(FileCacheBackend::open(dir.path()).unwrap()));
        assert!(cache.save("settings", &vec![1, 2, 3]));

        let reopened = LocalCache::new(Arc::new(FileCacheBackend::open(dir.path()).unwrap()));
        assert_eq!(reopened.get("settings", Vec::<u32>::new()), vec![1, 2, 3]);
        assert!(dir.path().join("settings.json").exists());
    }

    #[test]
    fn deleting_a_missing_slot_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileCacheBackend::open(dir.path().join("nested")).unwrap();
        assert!(backend.delete("nothing").is_ok());
        assert_eq!(backend.read("nothing").unwrap(), None);
    }

    #[test]
    fn keys_cannot_escape_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileCacheBackend::open(dir.path()).unwrap();
        assert!(matches!(
            backend.write("../outside", "1"),
            Err(CacheError::InvalidKey { .. })
        ));
    }
}
