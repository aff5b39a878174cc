//! Authenticated client retry behavior against a live upstream
//!
//! Runs a real axum server on an ephemeral port standing in for both the
//! platform token endpoint and its API, and verifies the 401 recovery
//! contract: at most two upstream attempts per logical call, exactly one
//! refresh, and a hard disconnect when the refresh itself fails.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use moodlens_common::Platform;
use moodlens_pa::auth::{AuthSession, AuthenticatedClient, CredentialStore, TokenPair};
use moodlens_pa::config::OAuthAppConfig;
use moodlens_pa::platform::PlatformEndpoints;
use serde_json::json;
use sqlx::SqlitePool;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone)]
struct Upstream {
    api_calls: Arc<AtomicUsize>,
    refresh_calls: Arc<AtomicUsize>,
    /// Token the API accepts; None makes every API call a 401
    accepted_token: Option<&'static str>,
    /// When false the token endpoint rejects refreshes
    refresh_ok: bool,
    /// Refresh token included in refresh responses, if any
    rotated_refresh: Option<&'static str>,
}

async fn api_handler(State(upstream): State<Upstream>, headers: HeaderMap) -> StatusCode {
    upstream.api_calls.fetch_add(1, Ordering::SeqCst);

    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    match upstream.accepted_token {
        Some(token) if bearer == format!("Bearer {}", token) => StatusCode::OK,
        _ => StatusCode::UNAUTHORIZED,
    }
}

async fn token_handler(
    State(upstream): State<Upstream>,
) -> (StatusCode, Json<serde_json::Value>) {
    upstream.refresh_calls.fetch_add(1, Ordering::SeqCst);

    if !upstream.refresh_ok {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant"})),
        );
    }

    let mut body = json!({"access_token": "fresh"});
    if let Some(rotated) = upstream.rotated_refresh {
        body["refresh_token"] = json!(rotated);
    }
    (StatusCode::OK, Json(body))
}

async fn spawn_upstream(upstream: Upstream) -> SocketAddr {
    let router = Router::new()
        .route("/api/data", get(api_handler))
        .route("/token", post(token_handler))
        .with_state(upstream);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

struct Harness {
    client: AuthenticatedClient,
    session: Arc<AuthSession>,
    store: CredentialStore,
    api_url: String,
    api_calls: Arc<AtomicUsize>,
    refresh_calls: Arc<AtomicUsize>,
}

async fn harness(
    accepted_token: Option<&'static str>,
    refresh_ok: bool,
    rotated_refresh: Option<&'static str>,
) -> Harness {
    let api_calls = Arc::new(AtomicUsize::new(0));
    let refresh_calls = Arc::new(AtomicUsize::new(0));

    let addr = spawn_upstream(Upstream {
        api_calls: api_calls.clone(),
        refresh_calls: refresh_calls.clone(),
        accepted_token,
        refresh_ok,
        rotated_refresh,
    })
    .await;

    let pool = SqlitePool::connect(":memory:").await.unwrap();
    moodlens_common::db::init_tables(&pool).await.unwrap();
    let store = CredentialStore::new(pool, Platform::Spotify);
    store
        .put(&TokenPair {
            access_token: "stale".into(),
            refresh_token: Some("r1".into()),
        })
        .await
        .unwrap();

    let endpoints = PlatformEndpoints {
        authorize_url: format!("http://{}/authorize", addr),
        token_url: format!("http://{}/token", addr),
        api_base: format!("http://{}/api", addr),
    };
    let http = reqwest::Client::new();
    let session = Arc::new(AuthSession::new(
        Platform::Spotify,
        endpoints,
        OAuthAppConfig {
            client_id: "id".into(),
            client_secret: "secret".into(),
            redirect_uri: "http://localhost/callback".into(),
        },
        store.clone(),
        http.clone(),
    ));

    Harness {
        client: AuthenticatedClient::new(session.clone(), http),
        session,
        store,
        api_url: format!("http://{}/api/data", addr),
        api_calls,
        refresh_calls,
    }
}

#[tokio::test]
async fn expiry_triggers_one_refresh_and_one_reissue() {
    let h = harness(Some("fresh"), true, Some("r2")).await;

    let response = h.client.get(&h.api_url).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    assert_eq!(h.api_calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.refresh_calls.load(Ordering::SeqCst), 1);

    // Rotated refresh token persisted alongside the fresh access token
    let pair = h.store.get().await.unwrap().unwrap();
    assert_eq!(pair.access_token, "fresh");
    assert_eq!(pair.refresh_token.as_deref(), Some("r2"));
}

#[tokio::test]
async fn unrotated_refresh_token_is_retained() {
    let h = harness(Some("fresh"), true, None).await;

    let response = h.client.get(&h.api_url).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let pair = h.store.get().await.unwrap().unwrap();
    assert_eq!(pair.refresh_token.as_deref(), Some("r1"));
}

#[tokio::test]
async fn never_more_than_two_attempts() {
    // Refresh succeeds but the API rejects the new token too; the second
    // 401 is final
    let h = harness(None, true, None).await;

    let response = h.client.get(&h.api_url).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    assert_eq!(h.api_calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_refresh_disconnects_and_returns_original_401() {
    let h = harness(None, false, None).await;

    let response = h.client.get(&h.api_url).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    // One API attempt, one refresh attempt, then full disconnect
    assert_eq!(h.api_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.refresh_calls.load(Ordering::SeqCst), 1);
    assert!(h.store.get().await.unwrap().is_none());
    assert!(!h.session.is_connected().await);
}

#[tokio::test]
async fn valid_token_needs_no_refresh() {
    let h = harness(Some("stale"), true, None).await;

    let response = h.client.get(&h.api_url).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    assert_eq!(h.api_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn disconnected_client_fails_without_network() {
    let h = harness(Some("stale"), true, None).await;
    h.session.disconnect().await;

    let result = h.client.get(&h.api_url).await;
    assert!(result.is_err());
    assert_eq!(h.api_calls.load(Ordering::SeqCst), 0);
}
