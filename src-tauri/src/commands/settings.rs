use super::CommandResult;
use crate::settings::{
    KEY_API_BASE_URL, KEY_PAGE_SIZE, KEY_REQUEST_TIMEOUT_SECONDS, MIN_REQUEST_TIMEOUT_SECONDS,
};
use crate::state::AppState;
use crate::types::{IpcError, IpcErrorCode, SaveSettingsPayload, SettingsState};
use tauri::{AppHandle, Runtime, State};

const MAX_PAGE_SIZE: u32 = 100;

#[tauri::command]
pub async fn settings_get<R: Runtime>(state: State<'_, AppState<R>>) -> CommandResult<SettingsState> {
    let config = state.config();
    Ok(SettingsState {
        api_base_url: config.base_url,
        request_timeout_seconds: u32::try_from(config.request_timeout_secs).unwrap_or(u32::MAX),
        page_size: config.page_size,
        keyring_available: state.tokens.is_available(),
    })
}

#[tauri::command]
pub async fn settings_save<R: Runtime>(
    app: AppHandle<R>,
    state: State<'_, AppState<R>>,
    payload: SaveSettingsPayload,
) -> CommandResult<SettingsState> {
    if u64::from(payload.request_timeout_seconds) < MIN_REQUEST_TIMEOUT_SECONDS {
        return Err(IpcError::new(
            IpcErrorCode::Validation,
            format!("Request timeout must be >= {MIN_REQUEST_TIMEOUT_SECONDS} seconds."),
        ));
    }
    if payload.page_size == 0 || payload.page_size > MAX_PAGE_SIZE {
        return Err(IpcError::new(
            IpcErrorCode::Validation,
            format!("Page size must be between 1 and {MAX_PAGE_SIZE}."),
        ));
    }

    let mut candidate = state.config();
    candidate.base_url = payload.api_base_url.trim().to_string();
    if let Err(e) = candidate.base_url() {
        return Err(IpcError::new(IpcErrorCode::Validation, e.to_string()));
    }

    state.settings.set(KEY_API_BASE_URL, candidate.base_url);
    state.settings.set(
        KEY_REQUEST_TIMEOUT_SECONDS,
        u64::from(payload.request_timeout_seconds),
    );
    state.settings.set(KEY_PAGE_SIZE, u64::from(payload.page_size));

    state.rebuild(&app).await?;
    settings_get(state).await
}
