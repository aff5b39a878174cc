//! Platform authentication endpoints
//!
//! The callback consumes the provider redirect and sends the browser back to
//! the frontend with a status-only query string; token material never
//! appears in a URL.

use crate::api::runtime;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum::Json;
use moodlens_common::events::AnalysisEvent;
use serde_json::json;
use std::collections::HashMap;

/// GET /api/{platform}/login
pub async fn login(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let runtime = runtime(&state, &platform)?;
    let auth_url = runtime.session.authorization_url()?;
    Ok(Json(json!({ "auth_url": auth_url })))
}

/// GET /api/{platform}/callback?code=...|error=...
pub async fn callback(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Redirect> {
    let runtime = runtime(&state, &platform)?;
    let key = runtime.platform.key();

    match runtime.session.consume_callback(&params).await {
        Ok(()) => {
            state.events.emit(AnalysisEvent::Connected {
                platform: runtime.platform,
            });
            Ok(Redirect::to(&format!(
                "{}/{}?connected=true",
                state.frontend_url, key
            )))
        }
        Err(err) => {
            tracing::warn!(platform = %runtime.platform, error = %err, "OAuth callback failed");
            Ok(Redirect::to(&format!(
                "{}/{}?error=auth_failed",
                state.frontend_url, key
            )))
        }
    }
}

/// POST /api/{platform}/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let runtime = runtime(&state, &platform)?;
    runtime.session.refresh().await?;
    Ok(Json(json!({ "refreshed": true })))
}

/// POST /api/{platform}/disconnect
pub async fn disconnect(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let runtime = runtime(&state, &platform)?;
    runtime.session.disconnect().await;
    state.events.emit(AnalysisEvent::Disconnected {
        platform: runtime.platform,
    });
    Ok(Json(json!({ "disconnected": true })))
}

/// GET /api/{platform}/me
///
/// Served from the session cache after the first successful fetch.
pub async fn me(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let runtime = runtime(&state, &platform)?;

    if !runtime.session.is_connected().await {
        return Err(ApiError::Unauthorized("Platform not connected".to_string()));
    }

    if let Some(user) = runtime.session.cached_user().await {
        return Ok(Json(json!({ "user": user, "connected": true })));
    }

    let user = runtime.catalog.current_user().await?;
    runtime.session.cache_user(user.clone()).await;
    Ok(Json(json!({ "user": user, "connected": true })))
}
