//! Analysis transports
//!
//! Two upstream shapes produce item profiles:
//!
//! - `PerItemAnalyzer` — one POST per item against the external analysis
//!   service (heavy audio analysis happens there).
//! - `BatchedAnalyzer` — one authenticated platform call resolves up to 100
//!   items at once (Spotify audio-features shape); a 403 means the account's
//!   app lacks the capability and every unresolved item becomes Unavailable
//!   rather than Failed.
//!
//! The orchestrator only sees the trait: a chunk of items in, one result per
//! item out, in the same order.

use crate::auth::AuthenticatedClient;
use crate::models::PlaylistItem;
use async_trait::async_trait;
use moodlens_common::AxisProfile;
use serde::Deserialize;

/// Result for one item of a chunk
#[derive(Debug, Clone, PartialEq)]
pub enum ItemResult {
    Profile(AxisProfile),
    Failed,
    Unavailable,
}

/// Results for one chunk, parallel to the input items
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    pub results: Vec<ItemResult>,
    /// True when the upstream refused analysis wholesale (capability
    /// restriction), as opposed to per-item failures
    pub restricted: bool,
}

impl ChunkOutcome {
    /// Every item failed; used when a whole upstream call errors
    pub fn all_failed(count: usize) -> Self {
        Self {
            results: vec![ItemResult::Failed; count],
            restricted: false,
        }
    }

    /// Every item unavailable with the restricted advisory set
    pub fn all_restricted(count: usize) -> Self {
        Self {
            results: vec![ItemResult::Unavailable; count],
            restricted: true,
        }
    }
}

/// Source of item profiles
#[async_trait]
pub trait AnalysisTransport: Send + Sync {
    /// Items per upstream call; 1 for per-item transports
    fn chunk_size(&self) -> usize;

    /// Resolve profiles for a chunk; never errors, failures are per-item
    async fn analyze_chunk(&self, items: &[PlaylistItem]) -> ChunkOutcome;
}

/// Profile payload shared by both transports
#[derive(Debug, Deserialize)]
struct ProfileBody {
    valence: f64,
    energy: f64,
    tension: f64,
    warmth: f64,
    power: f64,
    complexity: f64,
}

impl ProfileBody {
    fn into_profile(self) -> AxisProfile {
        AxisProfile::clamped(
            self.valence,
            self.energy,
            self.tension,
            self.warmth,
            self.power,
            self.complexity,
        )
    }
}

/// One POST per item against the external analysis service
pub struct PerItemAnalyzer {
    http: reqwest::Client,
    analysis_base: String,
}

impl PerItemAnalyzer {
    pub fn new(http: reqwest::Client, analysis_base: String) -> Self {
        Self {
            http,
            analysis_base,
        }
    }

    async fn analyze_one(&self, item: &PlaylistItem) -> ItemResult {
        #[derive(Deserialize)]
        struct AnalyzeResponse {
            profile: ProfileBody,
        }

        let url = format!("{}/analyze-item/{}", self.analysis_base, item.id);
        let response = match self.http.post(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(item_id = %item.id, error = %e, "Analysis request failed");
                return ItemResult::Failed;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                item_id = %item.id,
                status = response.status().as_u16(),
                "Analysis service rejected item"
            );
            return ItemResult::Failed;
        }

        match response.json::<AnalyzeResponse>().await {
            Ok(body) => ItemResult::Profile(body.profile.into_profile()),
            Err(e) => {
                tracing::warn!(item_id = %item.id, error = %e, "Malformed analysis payload");
                ItemResult::Failed
            }
        }
    }
}

#[async_trait]
impl AnalysisTransport for PerItemAnalyzer {
    fn chunk_size(&self) -> usize {
        1
    }

    async fn analyze_chunk(&self, items: &[PlaylistItem]) -> ChunkOutcome {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            results.push(self.analyze_one(item).await);
        }
        ChunkOutcome {
            results,
            restricted: false,
        }
    }
}

/// Spotify audio-features wire row; nulls stand in for unanalyzable tracks
#[derive(Debug, Deserialize)]
struct AudioFeatures {
    id: String,
    valence: f64,
    energy: f64,
    mode: f64,
    tempo: f64,
    acousticness: f64,
    danceability: f64,
    loudness: f64,
    instrumentalness: f64,
    speechiness: f64,
}

/// Derive the 6 axes from the platform's raw feature vector
///
/// Valence and energy map directly; the remaining four are weighted blends
/// of mode, tempo, acousticness, loudness, instrumentalness, speechiness
/// and danceability, each clamped into [0, 1].
fn features_to_profile(f: &AudioFeatures) -> AxisProfile {
    let tempo_norm = (f.tempo / 200.0).min(1.0);
    let loudness_norm = (f.loudness + 60.0) / 60.0;

    let tension = (1.0 - f.mode) * 0.3 + f.energy * 0.4 + tempo_norm * 0.3;
    let warmth = f.acousticness * 0.4 + f.valence * 0.4 + (1.0 - f.energy) * 0.2;
    let power = loudness_norm * 0.4 + f.energy * 0.4 + tempo_norm * 0.2;
    let complexity = f.instrumentalness * 0.3
        + (1.0 - f.speechiness) * 0.3
        + f.danceability * 0.2
        + tempo_norm * 0.2;

    AxisProfile::clamped(f.valence, f.energy, tension, warmth, power, complexity)
}

/// One authenticated platform call per chunk of up to 100 items
pub struct BatchedAnalyzer {
    client: AuthenticatedClient,
    api_base: String,
}

impl BatchedAnalyzer {
    pub const MAX_IDS_PER_CALL: usize = 100;

    pub fn new(client: AuthenticatedClient, api_base: String) -> Self {
        Self { client, api_base }
    }
}

#[async_trait]
impl AnalysisTransport for BatchedAnalyzer {
    fn chunk_size(&self) -> usize {
        Self::MAX_IDS_PER_CALL
    }

    async fn analyze_chunk(&self, items: &[PlaylistItem]) -> ChunkOutcome {
        #[derive(Deserialize)]
        struct FeaturesResponse {
            audio_features: Vec<Option<AudioFeatures>>,
        }

        let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        let url = format!("{}/audio-features?ids={}", self.api_base, ids.join(","));

        let response = match self.client.get(&url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Batched analysis request failed");
                return ChunkOutcome::all_failed(items.len());
            }
        };

        if response.status() == reqwest::StatusCode::FORBIDDEN {
            tracing::warn!("Audio features restricted for this application");
            return ChunkOutcome::all_restricted(items.len());
        }

        if !response.status().is_success() {
            tracing::warn!(
                status = response.status().as_u16(),
                "Batched analysis rejected"
            );
            return ChunkOutcome::all_failed(items.len());
        }

        let body: FeaturesResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed audio features payload");
                return ChunkOutcome::all_failed(items.len());
            }
        };

        // Index by id; rows can be null or out of order
        let by_id: std::collections::HashMap<String, AxisProfile> = body
            .audio_features
            .into_iter()
            .flatten()
            .map(|f| {
                let profile = features_to_profile(&f);
                (f.id, profile)
            })
            .collect();

        let results = items
            .iter()
            .map(|item| match by_id.get(&item.id) {
                Some(profile) => ItemResult::Profile(*profile),
                None => ItemResult::Failed,
            })
            .collect();

        ChunkOutcome {
            results,
            restricted: false,
        }
    }
}
