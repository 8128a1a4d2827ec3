use crate::error::StorageError;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Durable string key-value storage scoped to one client installation.
///
/// Tokens and the serialized list view state live here. Implementations are
/// synchronous: every call is a short local operation, never network I/O.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.values).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.values).remove(key);
        Ok(())
    }
}

/// A single JSON object on disk. Every mutation rewrites the file through a
/// sibling temp file and a rename, so a crash never leaves a torn document.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(data) if data.trim().is_empty() => BTreeMap::new(),
            Ok(data) => serde_json::from_str(&data)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.values).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = lock(&self.values);
        let mut next = values.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *values = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = lock(&self.values);
        if !values.contains_key(key) {
            return Ok(());
        }
        let mut next = values.clone();
        next.remove(key);
        self.flush(&next)?;
        *values = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_and_removes() {
        let store = MemoryStore::new();
        assert_eq!(store.get("access_token").unwrap(), None);
        store.set("access_token", "abc").unwrap();
        assert_eq!(store.get("access_token").unwrap().as_deref(), Some("abc"));
        store.remove("access_token").unwrap();
        store.remove("access_token").unwrap();
        assert_eq!(store.get("access_token").unwrap(), None);
    }

    #[test]
    fn json_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("client.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.set("refresh_token", "r-1").unwrap();
        store.set("movie_list_state", "{\"version\":1}").unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("refresh_token").unwrap().as_deref(), Some("r-1"));
        assert_eq!(
            reopened.get("movie_list_state").unwrap().as_deref(),
            Some("{\"version\":1}")
        );

        reopened.remove("refresh_token").unwrap();
        let again = JsonFileStore::open(&path).unwrap();
        assert_eq!(again.get("refresh_token").unwrap(), None);
    }

    #[test]
    fn failed_write_leaves_memory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.set("refresh_token", "r-1").unwrap();

        // A directory squatting on the temp path makes every flush fail.
        std::fs::create_dir(path.with_extension("json.tmp")).unwrap();

        assert!(store.set("refresh_token", "r-2").is_err());
        assert!(store.set("access_token", "a-2").is_err());
        assert!(store.remove("refresh_token").is_err());
        assert_eq!(store.get("refresh_token").unwrap().as_deref(), Some("r-1"));
        assert_eq!(store.get("access_token").unwrap(), None);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("refresh_token").unwrap().as_deref(), Some("r-1"));
    }

    #[test]
    fn json_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(JsonFileStore::open(&path), Err(StorageError::Json(_))));
    }
}
