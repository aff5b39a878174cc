//! HTTP surface tests driven through the router with tower's oneshot

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use moodlens_common::events::EventBus;
use moodlens_common::{AxisProfile, Platform};
use moodlens_pa::config::{OAuthAppConfig, ServiceConfig};
use moodlens_pa::platform::PlatformEndpoints;
use moodlens_pa::records::{RecordStore, SavedRecord, SqliteRecordStore, Visibility};
use moodlens_pa::{build_router, AppState, PlatformRuntime};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceExt;
use uuid::Uuid;

async fn test_app() -> (Router, AppState) {
    let db = SqlitePool::connect(":memory:").await.unwrap();
    moodlens_common::db::init_tables(&db).await.unwrap();

    let events = EventBus::new(64);
    let service = ServiceConfig {
        frontend_url: "http://localhost:3000".into(),
        analysis_service_url: "http://localhost:5802".into(),
    };

    let mut platforms = HashMap::new();
    for platform in Platform::ALL {
        platforms.insert(
            platform,
            PlatformRuntime::new(
                platform,
                db.clone(),
                events.clone(),
                PlatformEndpoints::for_platform(platform),
                OAuthAppConfig {
                    client_id: "id".into(),
                    client_secret: "secret".into(),
                    redirect_uri: "http://localhost:5701/callback".into(),
                },
                &service,
                reqwest::Client::new(),
            ),
        );
    }

    let records = Arc::new(SqliteRecordStore::new(db.clone()));
    let state = AppState {
        db,
        events,
        platforms,
        records,
        frontend_url: service.frontend_url.clone(),
        started_at: Instant::now(),
    };

    (build_router(state.clone()), state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_service_identity() {
    let (app, _) = test_app().await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "moodlens-pa");
}

#[tokio::test]
async fn unknown_platform_is_not_found_with_error_envelope() {
    let (app, _) = test_app().await;

    let response = app.oneshot(get("/api/soundcloud/login")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn login_returns_platform_auth_url() {
    let (app, _) = test_app().await;

    let response = app.oneshot(get("/api/spotify/login")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let url = body["auth_url"].as_str().unwrap();
    assert!(url.starts_with("https://accounts.spotify.com/authorize?"));
}

#[tokio::test]
async fn me_requires_connection() {
    let (app, _) = test_app().await;

    let response = app.oneshot(get("/api/youtube/me")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn analysis_status_starts_idle() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(get("/api/spotify/analysis/status"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["phase"], "idle");
    assert_eq!(body["epoch"], 0);
    assert_eq!(body["restricted"], false);
}

#[tokio::test]
async fn analysis_start_requires_connection() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(post_json(
            "/api/spotify/analysis/start",
            json!({"playlist_id": "p1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn toggling_unknown_item_selects_nothing() {
    let (app, _) = test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/spotify/selection/toggle",
            json!({"item_id": "never-analyzed"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["selected"], false);

    let response = app.oneshot(get("/api/spotify/selection")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["selected"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn saving_empty_selection_is_rejected() {
    let (app, _) = test_app().await;

    let response = app
        .oneshot(post_json("/api/spotify/records/save", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn saving_while_batch_runs_is_conflict() {
    let (app, state) = test_app().await;

    // Claim a run; the platform sits in the fetching phase until items arrive
    let runtime = state.platforms.get(&Platform::Spotify).unwrap();
    runtime.orchestrator.begin("p1").await;

    let response = app
        .oneshot(post_json("/api/spotify/records/save", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "CONFLICT");
}

fn sample_record(owner: &str, visibility: Visibility) -> SavedRecord {
    SavedRecord {
        id: Uuid::new_v4(),
        owner: owner.to_string(),
        platform: Platform::Spotify,
        item_id: "t1".into(),
        title: "A Song".into(),
        secondary_label: "An Artist".into(),
        thumbnail_url: None,
        profile: AxisProfile::NEUTRAL,
        profile_defaulted: false,
        visibility,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn record_crud_over_http() {
    let (app, state) = test_app().await;

    let record = sample_record("alice", Visibility::Private);
    let id = state.records.save(&record).await.unwrap();

    // List
    let response = app
        .clone()
        .oneshot(get("/api/records?owner=alice"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["records"].as_array().unwrap().len(), 1);

    // Private records stay out of the public listing
    let response = app
        .clone()
        .oneshot(get("/api/records/public?owner=alice"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["records"].as_array().unwrap().len(), 0);

    // Patch visibility
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/records/{}", id))
                .header("content-type", "application/json")
                .body(Body::from(json!({"visibility": "public"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["record"]["visibility"], "public");

    // Get
    let response = app
        .clone()
        .oneshot(get(&format!("/api/records/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Delete, then the record is gone
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/records/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get(&format!("/api/records/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_record_id_is_bad_request() {
    let (app, _) = test_app().await;

    let response = app.oneshot(get("/api/records/not-a-uuid")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
