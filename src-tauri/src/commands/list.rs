use super::CommandResult;
use crate::state::AppState;
use catalog_client::{FilterField, ListSnapshot, ListUpdate};
use tauri::{Runtime, State};

/// The renderer always receives the coordinator's current view, whether the
/// action fetched, was ignored, or lost to a newer one.
fn current(update: ListUpdate, fallback: impl FnOnce() -> ListSnapshot) -> ListSnapshot {
    match update {
        ListUpdate::Applied { snapshot } => snapshot,
        ListUpdate::Skipped | ListUpdate::Stale => fallback(),
    }
}

#[tauri::command]
pub async fn list_load<R: Runtime>(state: State<'_, AppState<R>>) -> CommandResult<ListSnapshot> {
    let list = state.handles().await.list;
    let update = list.refresh().await?;
    Ok(current(update, || list.snapshot()))
}

#[tauri::command]
pub async fn list_set_search<R: Runtime>(
    state: State<'_, AppState<R>>,
    text: String,
) -> CommandResult<ListSnapshot> {
    let list = state.handles().await.list;
    let update = list.set_search_text(&text).await?;
    Ok(current(update, || list.snapshot()))
}

#[tauri::command]
pub async fn list_set_filter<R: Runtime>(
    state: State<'_, AppState<R>>,
    field: FilterField,
) -> CommandResult<ListSnapshot> {
    let list = state.handles().await.list;
    let update = list.set_filter_field(field).await?;
    Ok(current(update, || list.snapshot()))
}

#[tauri::command]
pub async fn list_go_to_page<R: Runtime>(
    state: State<'_, AppState<R>>,
    page: u32,
) -> CommandResult<ListSnapshot> {
    let list = state.handles().await.list;
    let update = list.go_to_page(page).await?;
    Ok(current(update, || list.snapshot()))
}

#[tauri::command]
pub async fn list_reset<R: Runtime>(state: State<'_, AppState<R>>) -> CommandResult<ListSnapshot> {
    let list = state.handles().await.list;
    let update = list.reset_all().await?;
    Ok(current(update, || list.snapshot()))
}
