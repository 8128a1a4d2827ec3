use catalog_client::{ClientConfig, KeyValueStore, StorageError};
use serde_json::json;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tauri::Runtime;
use tauri_plugin_store::{JsonValue, Store, StoreBuilder};

const SETTINGS_STORE_FILE: &str = "cinema-settings.json";
const VIEW_STATE_STORE_FILE: &str = "cinema-view-state.json";

pub const KEY_API_BASE_URL: &str = "apiBaseUrl";
pub const KEY_REQUEST_TIMEOUT_SECONDS: &str = "requestTimeoutSeconds";
pub const KEY_PAGE_SIZE: &str = "pageSize";

pub const MIN_REQUEST_TIMEOUT_SECONDS: u64 = 5;

fn defaults(base: &ClientConfig) -> HashMap<String, JsonValue> {
    HashMap::from([
        (KEY_API_BASE_URL.to_string(), json!(base.base_url)),
        (
            KEY_REQUEST_TIMEOUT_SECONDS.to_string(),
            json!(base.request_timeout_secs),
        ),
        (KEY_PAGE_SIZE.to_string(), json!(base.page_size)),
    ])
}

/// User-editable client settings, persisted by the store plugin.
#[derive(Clone)]
pub struct SettingsStore<R: Runtime> {
    store: Arc<Store<R>>,
}

impl<R: Runtime> SettingsStore<R> {
    /// `base` supplies the defaults, so environment overrides seed a fresh install.
    pub fn new(app: &tauri::AppHandle<R>, base: &ClientConfig) -> tauri_plugin_store::Result<Self> {
        let store = StoreBuilder::new(app, SETTINGS_STORE_FILE)
            .defaults(defaults(base))
            .auto_save(Duration::from_millis(200))
            .build()?;
        Ok(Self { store })
    }

    pub fn get_u64(&self, key: &str, fallback: u64) -> u64 {
        self.store
            .get(key)
            .and_then(|v| v.as_u64())
            .unwrap_or(fallback)
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        let v = self.store.get(key)?;
        let s = v.as_str()?.trim();
        if s.is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    }

    pub fn set(&self, key: &str, value: impl Into<JsonValue>) {
        self.store.set(key.to_string(), value.into());
    }

    /// `base` with the stored user settings laid over it.
    pub fn client_config(&self, base: &ClientConfig) -> ClientConfig {
        let mut config = base.clone();
        config.base_url = self
            .get_string(KEY_API_BASE_URL)
            .unwrap_or_else(|| base.base_url.clone());
        config.request_timeout_secs = self
            .get_u64(KEY_REQUEST_TIMEOUT_SECONDS, base.request_timeout_secs)
            .max(MIN_REQUEST_TIMEOUT_SECONDS);
        config.page_size = u32::try_from(self.get_u64(KEY_PAGE_SIZE, u64::from(base.page_size)))
            .unwrap_or(base.page_size)
            .max(1);
        config
    }
}

/// String key-value storage on top of a store-plugin file. Holds the list
/// view state between launches.
pub struct TauriKvStore<R: Runtime> {
    store: Arc<Store<R>>,
}

impl<R: Runtime> TauriKvStore<R> {
    pub fn new(app: &tauri::AppHandle<R>) -> tauri_plugin_store::Result<Self> {
        let store = StoreBuilder::new(app, VIEW_STATE_STORE_FILE)
            .auto_save(Duration::from_millis(200))
            .build()?;
        Ok(Self { store })
    }
}

impl<R: Runtime> KeyValueStore for TauriKvStore<R> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .store
            .get(key)
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.store.set(key.to_string(), JsonValue::String(value.to_string()));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _ = self.store.delete(key.to_string());
        Ok(())
    }
}
