//! moodlens-pa: playlist analysis service
//!
//! Connects a user's streaming accounts (Spotify-shaped and YouTube-shaped),
//! enumerates their playlists, runs each item of a chosen playlist through an
//! analysis transport producing 6-axis emotion profiles, and persists a
//! user-selected subset of the results.
//!
//! Each platform gets an isolated runtime (session, catalog, orchestrator,
//! selection ledger); nothing is shared across platforms except the event bus
//! and the database pool.

pub mod analysis;
pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod platform;
pub mod records;

pub use api::build_router;

use crate::analysis::{AnalysisTransport, BatchAnalysisOrchestrator, BatchedAnalyzer, PerItemAnalyzer};
use crate::auth::{AuthSession, AuthenticatedClient, CredentialStore};
use crate::catalog::PlaylistCatalog;
use crate::config::{OAuthAppConfig, ServiceConfig};
use crate::ledger::SelectionLedger;
use crate::models::PlaylistItem;
use crate::platform::PlatformEndpoints;
use crate::records::RecordStore;
use moodlens_common::events::EventBus;
use moodlens_common::Platform;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Everything one platform's pipeline needs, fully isolated from the other
/// platform's
pub struct PlatformRuntime {
    pub platform: Platform,
    pub session: Arc<AuthSession>,
    pub catalog: PlaylistCatalog,
    pub orchestrator: BatchAnalysisOrchestrator,
    pub ledger: RwLock<SelectionLedger>,
    /// Details of the items in the current batch, for the save action
    pub analyzed_items: RwLock<HashMap<String, PlaylistItem>>,
}

impl PlatformRuntime {
    pub fn new(
        platform: Platform,
        db: SqlitePool,
        events: EventBus,
        endpoints: PlatformEndpoints,
        oauth: OAuthAppConfig,
        service: &ServiceConfig,
        http: reqwest::Client,
    ) -> Arc<Self> {
        let store = CredentialStore::new(db, platform);
        let session = Arc::new(AuthSession::new(
            platform,
            endpoints.clone(),
            oauth,
            store,
            http.clone(),
        ));
        let client = AuthenticatedClient::new(session.clone(), http.clone());
        let catalog = PlaylistCatalog::new(platform, client.clone(), endpoints.api_base.clone());

        // Spotify resolves profiles in bulk from the platform itself; YouTube
        // items go one at a time through the external analysis service.
        let transport: Arc<dyn AnalysisTransport> = match platform {
            Platform::Spotify => Arc::new(BatchedAnalyzer::new(
                client.clone(),
                endpoints.api_base.clone(),
            )),
            Platform::Youtube => Arc::new(PerItemAnalyzer::new(
                http,
                service.analysis_service_url.clone(),
            )),
        };
        let orchestrator = BatchAnalysisOrchestrator::new(platform, events, transport);

        Arc::new(Self {
            platform,
            session,
            catalog,
            orchestrator,
            ledger: RwLock::new(SelectionLedger::new()),
            analyzed_items: RwLock::new(HashMap::new()),
        })
    }
}

/// Shared application state for the HTTP layer
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub events: EventBus,
    pub platforms: HashMap<Platform, Arc<PlatformRuntime>>,
    pub records: Arc<dyn RecordStore>,
    pub frontend_url: String,
    pub started_at: Instant,
}
