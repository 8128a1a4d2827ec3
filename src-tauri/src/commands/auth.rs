use super::CommandResult;
use crate::state::AppState;
use crate::types::{LoginPayload, RegisterPayload, SessionStatus};
use tauri::{Runtime, State};

#[tauri::command]
pub async fn auth_status<R: Runtime>(state: State<'_, AppState<R>>) -> CommandResult<SessionStatus> {
    let handles = state.handles().await;
    Ok(SessionStatus {
        authenticated: handles.api.is_authenticated(),
    })
}

#[tauri::command]
pub async fn auth_login<R: Runtime>(
    state: State<'_, AppState<R>>,
    payload: LoginPayload,
) -> CommandResult<SessionStatus> {
    let handles = state.handles().await;
    handles.api.login(&payload.login, &payload.password).await?;
    Ok(SessionStatus {
        authenticated: handles.api.is_authenticated(),
    })
}

/// Registers, then signs in with the same credentials.
#[tauri::command]
pub async fn auth_register<R: Runtime>(
    state: State<'_, AppState<R>>,
    payload: RegisterPayload,
) -> CommandResult<SessionStatus> {
    let handles = state.handles().await;
    handles
        .api
        .register(&payload.email, &payload.nickname, &payload.password)
        .await?;
    handles.api.login(&payload.email, &payload.password).await?;
    Ok(SessionStatus {
        authenticated: handles.api.is_authenticated(),
    })
}

#[tauri::command]
pub async fn auth_logout<R: Runtime>(state: State<'_, AppState<R>>) -> CommandResult<SessionStatus> {
    let handles = state.handles().await;
    handles.api.logout()?;
    Ok(SessionStatus {
        authenticated: false,
    })
}
