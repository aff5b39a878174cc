//! Playlist catalog endpoints

use crate::api::runtime;
use crate::error::ApiResult;
use crate::AppState;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;

/// GET /api/{platform}/playlists
pub async fn list_playlists(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let runtime = runtime(&state, &platform)?;
    let playlists = runtime.catalog.playlists().await?;
    Ok(Json(json!({ "playlists": playlists })))
}

/// GET /api/{platform}/playlist/{id}/items
pub async fn list_items(
    State(state): State<AppState>,
    Path((platform, playlist_id)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    let runtime = runtime(&state, &platform)?;
    let items = runtime.catalog.playlist_items(&playlist_id).await?;
    Ok(Json(json!({ "total": items.len(), "items": items })))
}
