//! Core domain models shared across the pipeline

use serde::{Deserialize, Serialize};

/// The connected account's public identity on a platform
///
/// Fetched once per valid token pair and cached; dropped on disconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformUser {
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Immutable playlist snapshot; identity is the id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    /// None when the platform doesn't report a count (e.g. liked-videos)
    pub item_count: Option<u64>,
    pub image_url: Option<String>,
}

/// One entry of a playlist; order within the playlist is significant and
/// preserved end-to-end
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub id: String,
    pub title: String,
    /// Artist or channel name, depending on platform
    pub secondary_label: String,
    pub duration_seconds: Option<u64>,
    pub thumbnail_url: Option<String>,
}
