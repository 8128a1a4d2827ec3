use super::CommandResult;
use crate::state::AppState;
use crate::types::{ProgressPayload, ReviewPayload};
use catalog_client::models::{Actor, Genre, Movie, MovieDetail, Review, UserProfile};
use serde_json::Value;
use tauri::{Runtime, State};

#[tauri::command]
pub async fn genres_list<R: Runtime>(state: State<'_, AppState<R>>) -> CommandResult<Vec<Genre>> {
    Ok(state.handles().await.api.genres().await?)
}

#[tauri::command]
pub async fn movie_get<R: Runtime>(
    state: State<'_, AppState<R>>,
    movie_id: i64,
) -> CommandResult<MovieDetail> {
    Ok(state.handles().await.api.movie(movie_id).await?)
}

#[tauri::command]
pub async fn movie_save_progress<R: Runtime>(
    state: State<'_, AppState<R>>,
    movie_id: i64,
    payload: ProgressPayload,
) -> CommandResult<Value> {
    let api = state.handles().await.api;
    Ok(api.save_progress(movie_id, payload.into()).await?)
}

#[tauri::command]
pub async fn actor_get<R: Runtime>(
    state: State<'_, AppState<R>>,
    actor_id: i64,
) -> CommandResult<Actor> {
    Ok(state.handles().await.api.actor(actor_id).await?)
}

#[tauri::command]
pub async fn actor_movies<R: Runtime>(
    state: State<'_, AppState<R>>,
    actor_id: i64,
) -> CommandResult<Vec<Movie>> {
    Ok(state.handles().await.api.actor_movies(actor_id).await?)
}

#[tauri::command]
pub async fn profile_get<R: Runtime>(state: State<'_, AppState<R>>) -> CommandResult<UserProfile> {
    Ok(state.handles().await.api.profile().await?)
}

#[tauri::command]
pub async fn review_create<R: Runtime>(
    state: State<'_, AppState<R>>,
    movie_id: i64,
    payload: ReviewPayload,
) -> CommandResult<Review> {
    let api = state.handles().await.api;
    Ok(api.create_review(movie_id, &payload.into()).await?)
}

#[tauri::command]
pub async fn review_update<R: Runtime>(
    state: State<'_, AppState<R>>,
    movie_id: i64,
    payload: ReviewPayload,
) -> CommandResult<Review> {
    let api = state.handles().await.api;
    Ok(api.update_review(movie_id, &payload.into()).await?)
}

#[tauri::command]
pub async fn review_delete<R: Runtime>(
    state: State<'_, AppState<R>>,
    movie_id: i64,
    review_id: Option<i64>,
) -> CommandResult<()> {
    let api = state.handles().await.api;
    Ok(api.delete_review(movie_id, review_id).await?)
}
