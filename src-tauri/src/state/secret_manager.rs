use catalog_client::{KeyValueStore, StorageError};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

const KEYRING_SERVICE: &str = "com.cinematch.desktop";

/// Session tokens in the OS keychain/secret service, one entry per key.
///
/// Reads are served from an in-memory copy once loaded. When the platform has
/// no usable keyring the store degrades to memory only: the session then lasts
/// until the app exits.
pub struct KeyringStore {
    available: bool,
    in_memory: Mutex<HashMap<String, Option<String>>>,
}

fn lock(map: &Mutex<HashMap<String, Option<String>>>) -> MutexGuard<'_, HashMap<String, Option<String>>> {
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn backend(err: keyring::Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

impl KeyringStore {
    pub fn new() -> Self {
        let available = Self::probe();
        if !available {
            warn!("OS keyring unavailable; session tokens will not survive a restart");
        }
        Self {
            available,
            in_memory: Mutex::new(HashMap::new()),
        }
    }

    fn entry(key: &str) -> Result<keyring::Entry, keyring::Error> {
        keyring::Entry::new(KEYRING_SERVICE, key)
    }

    fn probe() -> bool {
        let Ok(entry) = Self::entry("probe") else {
            return false;
        };

        match entry.get_password() {
            Ok(_) => true,
            Err(keyring::Error::NoEntry) => true,
            Err(keyring::Error::BadEncoding(_)) => true,
            Err(keyring::Error::Ambiguous(_)) => true,
            Err(keyring::Error::NoStorageAccess(_)) => false,
            Err(keyring::Error::PlatformFailure(_)) => false,
            Err(_) => false,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if let Some(cached) = lock(&self.in_memory).get(key) {
            return Ok(cached.clone());
        }
        if !self.available {
            return Ok(None);
        }

        let value = match Self::entry(key).and_then(|e| e.get_password()) {
            Ok(pwd) => {
                let trimmed = pwd.trim().to_string();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            Err(keyring::Error::NoEntry) => None,
            Err(e) => return Err(backend(e)),
        };
        lock(&self.in_memory).insert(key.to_string(), value.clone());
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.in_memory).insert(key.to_string(), Some(value.to_string()));
        if !self.available {
            return Ok(());
        }
        Self::entry(key)
            .and_then(|e| e.set_password(value))
            .map_err(backend)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.in_memory).insert(key.to_string(), None);
        if !self.available {
            return Ok(());
        }
        match Self::entry(key).and_then(|e| e.delete_credential()) {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(backend(e)),
        }
    }
}
