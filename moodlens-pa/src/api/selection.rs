//! Selection and save endpoints
//!
//! Selection is only meaningful against the current batch: eligible items
//! are those with a Succeeded outcome, plus Unavailable ones (which save
//! with the neutral default profile and an advisory). Saved items leave the
//! selection permanently, so repeating the save action cannot duplicate
//! records.

use crate::analysis::Phase;
use crate::api::runtime;
use crate::error::{ApiError, ApiResult};
use crate::records::{SavedRecord, Visibility};
use crate::AppState;
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use moodlens_common::events::{AnalysisEvent, OutcomeStatus};
use moodlens_common::AxisProfile;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

fn is_eligible(status: OutcomeStatus) -> bool {
    matches!(
        status,
        OutcomeStatus::Succeeded | OutcomeStatus::Unavailable
    )
}

/// GET /api/{platform}/selection
pub async fn current(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let runtime = runtime(&state, &platform)?;
    let ledger = runtime.ledger.read().await;
    Ok(Json(json!({
        "selected": ledger.selected(),
        "saved_count": ledger.saved_count(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub item_id: String,
}

/// POST /api/{platform}/selection/toggle
pub async fn toggle(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    Json(request): Json<ToggleRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let runtime = runtime(&state, &platform)?;

    let snapshot = runtime.orchestrator.snapshot().await;
    let eligible = snapshot
        .outcomes
        .iter()
        .any(|o| o.item_id == request.item_id && is_eligible(o.status));

    let mut ledger = runtime.ledger.write().await;
    ledger.toggle(&request.item_id, eligible);
    Ok(Json(json!({ "selected": ledger.is_selected(&request.item_id) })))
}

/// POST /api/{platform}/selection/all
pub async fn select_all(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let runtime = runtime(&state, &platform)?;

    let snapshot = runtime.orchestrator.snapshot().await;
    let eligible: Vec<String> = snapshot
        .outcomes
        .iter()
        .filter(|o| is_eligible(o.status))
        .map(|o| o.item_id.clone())
        .collect();

    let mut ledger = runtime.ledger.write().await;
    ledger.select_all(eligible);
    Ok(Json(json!({ "selected": ledger.selected() })))
}

/// POST /api/{platform}/selection/none
pub async fn select_none(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let runtime = runtime(&state, &platform)?;
    runtime.ledger.write().await.select_none();
    Ok(Json(json!({ "selected": [] })))
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub owner: Option<String>,
}

/// POST /api/{platform}/records/save
///
/// Persists the current selection. Rejected with 409 while a batch is still
/// running, since outcomes are not final yet. Each item is saved at most once;
/// Unavailable items get the neutral default profile with the defaulted
/// marker set. Items whose insert fails stay selected so the action can be
/// retried without duplicating the ones that went through.
pub async fn save_records(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    Json(request): Json<SaveRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let runtime = runtime(&state, &platform)?;
    let visibility = request.visibility.unwrap_or(Visibility::Private);

    let owner = match request.owner {
        Some(owner) if !owner.trim().is_empty() => owner,
        _ => runtime
            .session
            .cached_user()
            .await
            .map(|user| user.display_name)
            .unwrap_or_else(|| "local".to_string()),
    };

    let snapshot = runtime.orchestrator.snapshot().await;
    if matches!(snapshot.phase, Phase::Fetching | Phase::Analyzing) {
        return Err(ApiError::Conflict(
            "Batch analysis still in progress".to_string(),
        ));
    }
    let selected = runtime.ledger.read().await.selected();
    if selected.is_empty() {
        return Err(ApiError::BadRequest("Nothing selected".to_string()));
    }
    let item_details = runtime.analyzed_items.read().await.clone();

    let mut saved_ids = Vec::new();
    let mut failed = 0usize;
    let mut defaulted = 0usize;

    // Walk outcomes (not the selection set) so saves land in playlist order
    for outcome in &snapshot.outcomes {
        if !selected.contains(&outcome.item_id) {
            continue;
        }

        let (profile, profile_defaulted) = match outcome.status {
            OutcomeStatus::Succeeded => match outcome.profile {
                Some(profile) => (profile, false),
                None => continue,
            },
            OutcomeStatus::Unavailable => (AxisProfile::NEUTRAL, true),
            _ => continue,
        };

        let details = item_details.get(&outcome.item_id);
        let record = SavedRecord {
            id: Uuid::new_v4(),
            owner: owner.clone(),
            platform: runtime.platform,
            item_id: outcome.item_id.clone(),
            title: outcome.title.clone(),
            secondary_label: details
                .map(|item| item.secondary_label.clone())
                .unwrap_or_default(),
            thumbnail_url: details.and_then(|item| item.thumbnail_url.clone()),
            profile,
            profile_defaulted,
            visibility,
            created_at: Utc::now(),
        };

        match state.records.save(&record).await {
            Ok(_) => {
                if profile_defaulted {
                    defaulted += 1;
                }
                saved_ids.push(outcome.item_id.clone());
            }
            Err(err) => {
                // Failed ids stay selected for a retry
                failed += 1;
                tracing::warn!(
                    platform = %runtime.platform,
                    item_id = %outcome.item_id,
                    error = %err,
                    "Record save failed"
                );
            }
        }
    }

    runtime
        .ledger
        .write()
        .await
        .mark_saved(saved_ids.iter().cloned());

    state.events.emit(AnalysisEvent::RecordsSaved {
        platform: runtime.platform,
        saved: saved_ids.len(),
        defaulted,
    });

    let advisory = if defaulted > 0 {
        Some(format!(
            "{} item(s) saved with the neutral default profile because analysis was unavailable",
            defaulted
        ))
    } else {
        None
    };

    Ok(Json(json!({
        "saved": saved_ids,
        "defaulted": defaulted,
        "failed": failed,
        "advisory": advisory,
    })))
}
