//! Saved record CRUD endpoints

use crate::error::{ApiError, ApiResult};
use crate::records::RecordPatch;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub owner: String,
}

/// GET /api/records?owner=
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let records = state.records.list(&query.owner).await?;
    Ok(Json(json!({ "records": records })))
}

/// GET /api/records/public?owner=
pub async fn list_public(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let records = state.records.list_public(&query.owner).await?;
    Ok(Json(json!({ "records": records })))
}

fn parse_id(id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| ApiError::BadRequest(format!("Invalid record id: {}", id)))
}

/// GET /api/records/{id}
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = parse_id(&id)?;
    let record = state
        .records
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Record {}", id)))?;
    Ok(Json(json!({ "record": record })))
}

/// PATCH /api/records/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<RecordPatch>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = parse_id(&id)?;
    let record = state
        .records
        .update(id, patch)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Record {}", id)))?;
    Ok(Json(json!({ "record": record })))
}

/// DELETE /api/records/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = parse_id(&id)?;
    if !state.records.delete(id).await? {
        return Err(ApiError::NotFound(format!("Record {}", id)));
    }
    Ok(Json(json!({ "deleted": true })))
}
