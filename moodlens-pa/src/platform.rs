//! Per-platform OAuth and API endpoint sets
//!
//! Endpoint URLs are carried as data (not consts baked into call sites) so
//! tests can point a session at a local server.

use moodlens_common::Platform;

const SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// OAuth scopes requested per platform
pub fn scopes(platform: Platform) -> &'static str {
    match platform {
        Platform::Spotify => "playlist-read-private playlist-read-collaborative user-library-read",
        Platform::Youtube => "https://www.googleapis.com/auth/youtube.readonly",
    }
}

/// Endpoint set for one platform
#[derive(Debug, Clone)]
pub struct PlatformEndpoints {
    /// Authorization page the user's browser is sent to
    pub authorize_url: String,
    /// Token endpoint for code exchange and refresh
    pub token_url: String,
    /// REST API base for user/catalog/analysis calls
    pub api_base: String,
}

impl PlatformEndpoints {
    /// Production endpoints for the given platform
    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Spotify => Self {
                authorize_url: SPOTIFY_AUTH_URL.to_string(),
                token_url: SPOTIFY_TOKEN_URL.to_string(),
                api_base: SPOTIFY_API_BASE.to_string(),
            },
            Platform::Youtube => Self {
                authorize_url: GOOGLE_AUTH_URL.to_string(),
                token_url: GOOGLE_TOKEN_URL.to_string(),
                api_base: YOUTUBE_API_BASE.to_string(),
            },
        }
    }
}
