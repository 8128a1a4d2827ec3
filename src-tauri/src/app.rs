use crate::commands;
use crate::settings::{SettingsStore, TauriKvStore};
use crate::state::{AppState, KeyringStore};
use catalog_client::ClientConfig;
use std::sync::Arc;
use tauri::Manager;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn setup_error(e: impl std::error::Error + 'static) -> tauri::Error {
    let err: Box<dyn std::error::Error> = Box::new(e);
    tauri::Error::Setup(err.into())
}

/// `CINEMA_LOG` first, then `RUST_LOG`, then `info`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("CINEMA_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub fn run() {
    init_tracing();

    let result = tauri::Builder::default()
        .plugin(tauri_plugin_store::Builder::default().build())
        .invoke_handler(tauri::generate_handler![
            commands::auth_status,
            commands::auth_login,
            commands::auth_register,
            commands::auth_logout,
            commands::list_load,
            commands::list_set_search,
            commands::list_set_filter,
            commands::list_go_to_page,
            commands::list_reset,
            commands::genres_list,
            commands::movie_get,
            commands::movie_save_progress,
            commands::actor_get,
            commands::actor_movies,
            commands::profile_get,
            commands::review_create,
            commands::review_update,
            commands::review_delete,
            commands::settings_get,
            commands::settings_save,
        ])
        .setup(|app| {
            let app_handle = app.handle().clone();
            let base_config = ClientConfig::from_env().map_err(setup_error)?;

            let settings = SettingsStore::new(&app_handle, &base_config).map_err(setup_error)?;
            let view_state = Arc::new(TauriKvStore::new(&app_handle).map_err(setup_error)?);
            let tokens = Arc::new(KeyringStore::new());

            let state = AppState::new(&app_handle, settings, base_config, tokens, view_state)
                .map_err(setup_error)?;
            info!(base_url = %state.config().base_url, "cinema desktop started");

            app.manage(state);
            Ok(())
        })
        .run(tauri::generate_context!());

    if let Err(e) = result {
        tracing::error!(error = %e, "error while running tauri application");
        std::process::exit(1);
    }
}
