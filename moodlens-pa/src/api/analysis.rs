//! Batch analysis endpoints
//!
//! Start claims a new epoch (superseding any running batch), kicks the fetch
//! and analysis loop off in the background and returns immediately; progress
//! is observable through the status snapshot and the SSE stream.

use crate::api::runtime;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::Json;
use futures::stream::Stream;
use moodlens_common::Platform;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub playlist_id: String,
}

/// POST /api/{platform}/analysis/start
pub async fn start(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    Json(request): Json<StartRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let runtime = runtime(&state, &platform)?;

    if request.playlist_id.trim().is_empty() {
        return Err(ApiError::BadRequest("playlist_id is required".to_string()));
    }
    if !runtime.session.is_connected().await {
        return Err(ApiError::Unauthorized("Platform not connected".to_string()));
    }

    let (epoch, token) = runtime.orchestrator.begin(&request.playlist_id).await;
    runtime.ledger.write().await.reset();

    let task_runtime = runtime.clone();
    let playlist_id = request.playlist_id.clone();
    tokio::spawn(async move {
        match task_runtime.catalog.playlist_items(&playlist_id).await {
            Ok(items) => {
                {
                    // Retain item details for the save action
                    let mut cache = task_runtime.analyzed_items.write().await;
                    cache.clear();
                    cache.extend(items.iter().map(|item| (item.id.clone(), item.clone())));
                }
                task_runtime.orchestrator.run(epoch, token, items).await
            }
            Err(err) => {
                tracing::warn!(
                    platform = %task_runtime.platform,
                    playlist_id = %playlist_id,
                    error = %err,
                    "Playlist fetch failed, aborting run"
                );
                task_runtime.orchestrator.abort_fetch(epoch).await;
            }
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "started": true, "epoch": epoch })),
    ))
}

/// GET /api/{platform}/analysis/status
pub async fn status(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let runtime = runtime(&state, &platform)?;
    let snapshot = runtime.orchestrator.snapshot().await;
    Ok(Json(serde_json::to_value(snapshot).map_err(|e| {
        ApiError::Internal(format!("Snapshot serialization failed: {}", e))
    })?))
}

/// POST /api/{platform}/analysis/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let runtime = runtime(&state, &platform)?;
    runtime.orchestrator.cancel().await;
    Ok(Json(json!({ "cancelled": true })))
}

/// GET /api/{platform}/analysis/events - SSE stream of this platform's events
pub async fn events(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let runtime = runtime(&state, &platform)?;
    let platform: Platform = runtime.platform;

    tracing::info!(platform = %platform, "New SSE client connected to analysis events");
    let mut rx = state.events.subscribe();

    let stream = async_stream::stream! {
        loop {
            tokio::select! {
                // Heartbeat every 15 seconds
                _ = tokio::time::sleep(Duration::from_secs(15)) => {
                    yield Ok(Event::default().comment("heartbeat"));
                }

                Ok(event) = rx.recv() => {
                    if event.platform() != platform {
                        continue;
                    }

                    match serde_json::to_string(&event) {
                        Ok(event_json) => {
                            yield Ok(Event::default()
                                .event(event.event_type())
                                .data(event_json));
                        }
                        Err(e) => {
                            tracing::warn!(
                                event_type = event.event_type(),
                                error = %e,
                                "Failed to serialize SSE event"
                            );
                        }
                    }
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}
