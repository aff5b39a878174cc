//! HTTP API
//!
//! All routes are assembled here; handlers live in per-concern modules.
//! Platform-scoped routes take the platform as a path segment and resolve it
//! to the per-platform runtime before doing anything else.

pub mod analysis;
pub mod auth;
pub mod catalog;
pub mod health;
pub mod records;
pub mod selection;

use crate::error::{ApiError, ApiResult};
use crate::{AppState, PlatformRuntime};
use axum::routing::{get, post};
use axum::Router;
use moodlens_common::Platform;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Resolve a path platform segment to its runtime
pub fn runtime(state: &AppState, platform: &str) -> ApiResult<Arc<PlatformRuntime>> {
    let platform: Platform = platform
        .parse()
        .map_err(|_| ApiError::NotFound(format!("Unknown platform: {}", platform)))?;

    state
        .platforms
        .get(&platform)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("Platform not configured: {}", platform)))
}

/// Build the full application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        // Platform auth
        .route("/api/:platform/login", get(auth::login))
        .route("/api/:platform/callback", get(auth::callback))
        .route("/api/:platform/refresh", post(auth::refresh))
        .route("/api/:platform/disconnect", post(auth::disconnect))
        .route("/api/:platform/me", get(auth::me))
        // Catalog
        .route("/api/:platform/playlists", get(catalog::list_playlists))
        .route(
            "/api/:platform/playlist/:id/items",
            get(catalog::list_items),
        )
        // Batch analysis
        .route("/api/:platform/analysis/start", post(analysis::start))
        .route("/api/:platform/analysis/status", get(analysis::status))
        .route("/api/:platform/analysis/events", get(analysis::events))
        .route("/api/:platform/analysis/cancel", post(analysis::cancel))
        // Selection + save
        .route("/api/:platform/selection", get(selection::current))
        .route("/api/:platform/selection/toggle", post(selection::toggle))
        .route("/api/:platform/selection/all", post(selection::select_all))
        .route("/api/:platform/selection/none", post(selection::select_none))
        .route("/api/:platform/records/save", post(selection::save_records))
        // Saved records
        .route("/api/records", get(records::list))
        .route("/api/records/public", get(records::list_public))
        .route(
            "/api/records/:id",
            get(records::get_one)
                .patch(records::update)
                .delete(records::delete),
        )
        // Browser frontend runs on a different origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
