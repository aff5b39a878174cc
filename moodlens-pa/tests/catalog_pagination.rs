//! Catalog pagination against a live upstream
//!
//! The platform APIs page their listings; the catalog must follow pagination
//! to exhaustion and keep the upstream order intact across page boundaries.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use moodlens_common::Platform;
use moodlens_pa::auth::{AuthSession, AuthenticatedClient, CredentialStore, TokenPair};
use moodlens_pa::catalog::PlaylistCatalog;
use moodlens_pa::config::OAuthAppConfig;
use moodlens_pa::platform::PlatformEndpoints;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Clone)]
struct Paged {
    base: Arc<std::sync::OnceLock<String>>,
}

async fn spotify_playlists(
    State(paged): State<Paged>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let base = paged.base.get().cloned().unwrap_or_default();
    match params.get("offset").map(String::as_str) {
        None => Json(json!({
            "items": [
                {"id": "p1", "name": "First", "tracks": {"total": 1}},
                {"id": "p2", "name": "Second", "tracks": {"total": 2}}
            ],
            "next": format!("{}/me/playlists?limit=50&offset=50", base)
        })),
        Some("50") => Json(json!({
            "items": [
                {"id": "p3", "name": "Third", "tracks": {"total": 3}}
            ],
            "next": null
        })),
        other => panic!("unexpected offset: {:?}", other),
    }
}

async fn youtube_playlists(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    match params.get("pageToken").map(String::as_str) {
        None => Json(json!({
            "items": [
                {"id": "PL1", "snippet": {"title": "Mix One"},
                 "contentDetails": {"itemCount": 4}}
            ],
            "nextPageToken": "tok2"
        })),
        Some("tok2") => Json(json!({
            "items": [
                {"id": "PL2", "snippet": {"title": "Mix Two"},
                 "contentDetails": {"itemCount": 9}}
            ]
        })),
        other => panic!("unexpected pageToken: {:?}", other),
    }
}

async fn spawn_upstream() -> (SocketAddr, Paged) {
    let paged = Paged {
        base: Arc::new(std::sync::OnceLock::new()),
    };
    let router = Router::new()
        .route("/me/playlists", get(spotify_playlists))
        .route("/playlists", get(youtube_playlists))
        .with_state(paged.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    paged.base.set(format!("http://{}", addr)).unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr, paged)
}

async fn catalog_for(platform: Platform, addr: SocketAddr) -> PlaylistCatalog {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    moodlens_common::db::init_tables(&pool).await.unwrap();

    let store = CredentialStore::new(pool, platform);
    store
        .put(&TokenPair {
            access_token: "token".into(),
            refresh_token: None,
        })
        .await
        .unwrap();

    let api_base = format!("http://{}", addr);
    let endpoints = PlatformEndpoints {
        authorize_url: format!("{}/authorize", api_base),
        token_url: format!("{}/token", api_base),
        api_base: api_base.clone(),
    };
    let http = reqwest::Client::new();
    let session = Arc::new(AuthSession::new(
        platform,
        endpoints,
        OAuthAppConfig {
            client_id: "id".into(),
            client_secret: "secret".into(),
            redirect_uri: "http://localhost/callback".into(),
        },
        store,
        http.clone(),
    ));

    PlaylistCatalog::new(
        platform,
        AuthenticatedClient::new(session, http),
        api_base,
    )
}

#[tokio::test]
async fn spotify_playlists_follow_next_to_exhaustion() {
    let (addr, _paged) = spawn_upstream().await;
    let catalog = catalog_for(Platform::Spotify, addr).await;

    let playlists = catalog.playlists().await.unwrap();
    assert_eq!(
        playlists.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
        vec!["p1", "p2", "p3"]
    );
    assert_eq!(playlists[2].item_count, Some(3));
}

#[tokio::test]
async fn youtube_playlists_follow_page_tokens_with_liked_videos_first() {
    let (addr, _paged) = spawn_upstream().await;
    let catalog = catalog_for(Platform::Youtube, addr).await;

    let playlists = catalog.playlists().await.unwrap();
    assert_eq!(
        playlists.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
        vec!["LL", "PL1", "PL2"]
    );

    // The liked-videos pseudo-playlist has no reported count
    assert_eq!(playlists[0].name, "Liked Videos");
    assert!(playlists[0].item_count.is_none());
    assert_eq!(playlists[2].item_count, Some(9));
}
