use super::KeyringStore;
use crate::settings::{SettingsStore, TauriKvStore};
use crate::types::SessionStatus;
use catalog_client::{ApiError, CatalogApi, ClientConfig, KeyValueStore, ListViewCoordinator};
use std::sync::Arc;
use tauri::{AppHandle, Emitter, EventTarget, Runtime};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const SESSION_EVENT: &str = "session:changed";

/// The live client stack. Rebuilt when the API settings change; the stores
/// outlive it, so the session and the list state carry over.
#[derive(Clone)]
pub struct ClientHandles {
    pub api: CatalogApi,
    pub list: Arc<ListViewCoordinator>,
}

pub struct AppState<R: Runtime> {
    pub settings: SettingsStore<R>,
    pub base_config: ClientConfig,
    pub tokens: Arc<KeyringStore>,
    pub view_state: Arc<TauriKvStore<R>>,
    pub client: Arc<Mutex<ClientHandles>>,
}

impl<R: Runtime> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            settings: self.settings.clone(),
            base_config: self.base_config.clone(),
            tokens: self.tokens.clone(),
            view_state: self.view_state.clone(),
            client: self.client.clone(),
        }
    }
}

impl<R: Runtime> AppState<R> {
    pub fn new(
        app: &AppHandle<R>,
        settings: SettingsStore<R>,
        base_config: ClientConfig,
        tokens: Arc<KeyringStore>,
        view_state: Arc<TauriKvStore<R>>,
    ) -> Result<Self, ApiError> {
        let config = settings.client_config(&base_config);
        let handles = build_client(app, &config, tokens.clone(), view_state.clone())?;
        Ok(Self {
            settings,
            base_config,
            tokens,
            view_state,
            client: Arc::new(Mutex::new(handles)),
        })
    }

    pub fn config(&self) -> ClientConfig {
        self.settings.client_config(&self.base_config)
    }

    pub async fn handles(&self) -> ClientHandles {
        self.client.lock().await.clone()
    }

    pub async fn rebuild(&self, app: &AppHandle<R>) -> Result<(), ApiError> {
        let config = self.config();
        let handles = build_client(app, &config, self.tokens.clone(), self.view_state.clone())?;
        *self.client.lock().await = handles;
        info!(base_url = %config.base_url, "catalog client rebuilt");
        Ok(())
    }
}

fn build_client<R: Runtime>(
    app: &AppHandle<R>,
    config: &ClientConfig,
    tokens: Arc<KeyringStore>,
    view_state: Arc<dyn KeyValueStore>,
) -> Result<ClientHandles, ApiError> {
    let api = CatalogApi::connect(config, tokens)?;
    let list = Arc::new(ListViewCoordinator::new(
        Arc::new(api.clone()),
        view_state,
        config.page_size(),
    ));
    list.restore();
    forward_session_changes(app.clone(), &api);
    Ok(ClientHandles { api, list })
}

/// Emits `session:changed` whenever the session gains or loses its access
/// token, including teardown after a failed refresh. Ends with the session.
fn forward_session_changes<R: Runtime>(app: AppHandle<R>, api: &CatalogApi) {
    let mut rx = api.session().subscribe();
    tauri::async_runtime::spawn(async move {
        let mut last = *rx.borrow_and_update();
        while rx.changed().await.is_ok() {
            let authenticated = *rx.borrow_and_update();
            if authenticated == last {
                continue;
            }
            last = authenticated;
            debug!(authenticated, "session state changed");
            let _ = app.emit_to(
                EventTarget::any(),
                SESSION_EVENT,
                SessionStatus { authenticated },
            );
        }
    });
}
