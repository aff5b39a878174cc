//! Playlist catalog retrieval
//!
//! Fetches the connected account's playlists and their items from the
//! platform REST APIs, following pagination to exhaustion and preserving the
//! platform's ordering end-to-end. Parsing is separated from transport so the
//! wire-shape handling is unit-testable without a live platform.

use crate::auth::{AuthError, AuthenticatedClient};
use crate::models::{Playlist, PlaylistItem, PlatformUser};
use moodlens_common::Platform;
use serde::Deserialize;
use thiserror::Error;

/// YouTube's implicit liked-videos list; presented as a playlist with an
/// unknown item count
const LIKED_VIDEOS_ID: &str = "LL";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Platform returned {status} for {context}")]
    Upstream { status: u16, context: &'static str },

    #[error("Unexpected platform payload: {0}")]
    Parse(String),
}

impl From<CatalogError> for crate::error::ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Auth(auth) => auth.into(),
            CatalogError::Upstream { .. } => crate::error::ApiError::Upstream(err.to_string()),
            CatalogError::Parse(_) => crate::error::ApiError::Upstream(err.to_string()),
        }
    }
}

/// Catalog reader for one platform
#[derive(Clone)]
pub struct PlaylistCatalog {
    platform: Platform,
    client: AuthenticatedClient,
    api_base: String,
}

impl PlaylistCatalog {
    pub fn new(platform: Platform, client: AuthenticatedClient, api_base: String) -> Self {
        Self {
            platform,
            client,
            api_base,
        }
    }

    /// The connected account's public identity
    pub async fn current_user(&self) -> Result<PlatformUser, CatalogError> {
        match self.platform {
            Platform::Spotify => {
                let body = self.get_json(&format!("{}/me", self.api_base), "me").await?;
                parse_spotify_user(&body)
            }
            Platform::Youtube => {
                let url = format!("{}/channels?part=snippet&mine=true", self.api_base);
                let body = self.get_json(&url, "channels").await?;
                parse_youtube_user(&body)
            }
        }
    }

    /// All of the account's playlists, in platform order
    pub async fn playlists(&self) -> Result<Vec<Playlist>, CatalogError> {
        match self.platform {
            Platform::Spotify => self.spotify_playlists().await,
            Platform::Youtube => self.youtube_playlists().await,
        }
    }

    /// All items of one playlist, in playlist order
    pub async fn playlist_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>, CatalogError> {
        match self.platform {
            Platform::Spotify => self.spotify_items(playlist_id).await,
            Platform::Youtube => self.youtube_items(playlist_id).await,
        }
    }

    async fn spotify_playlists(&self) -> Result<Vec<Playlist>, CatalogError> {
        let mut playlists = Vec::new();
        let mut url = Some(format!("{}/me/playlists?limit=50", self.api_base));

        while let Some(page_url) = url {
            let body = self.get_json(&page_url, "playlists").await?;
            let (page, next) = parse_spotify_playlists(&body)?;
            playlists.extend(page);
            url = next;
        }

        tracing::debug!(
            platform = %self.platform,
            count = playlists.len(),
            "Playlist catalog fetched"
        );
        Ok(playlists)
    }

    async fn spotify_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>, CatalogError> {
        let mut items = Vec::new();
        let mut url = Some(format!(
            "{}/playlists/{}/tracks?limit=100",
            self.api_base, playlist_id
        ));

        while let Some(page_url) = url {
            let body = self.get_json(&page_url, "playlist tracks").await?;
            let (page, next) = parse_spotify_tracks(&body)?;
            items.extend(page);
            url = next;
        }

        Ok(items)
    }

    async fn youtube_playlists(&self) -> Result<Vec<Playlist>, CatalogError> {
        // Liked videos is not enumerated by the playlists endpoint but is
        // always addressable; surface it first with an unknown count.
        let mut playlists = vec![Playlist {
            id: LIKED_VIDEOS_ID.to_string(),
            name: "Liked Videos".to_string(),
            item_count: None,
            image_url: None,
        }];

        let mut page_token: Option<String> = None;
        loop {
            let mut url = format!(
                "{}/playlists?part=snippet,contentDetails&mine=true&maxResults=50",
                self.api_base
            );
            if let Some(token) = &page_token {
                url.push_str("&pageToken=");
                url.push_str(token);
            }

            let body = self.get_json(&url, "playlists").await?;
            let (page, next) = parse_youtube_playlists(&body)?;
            playlists.extend(page);

            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(playlists)
    }

    async fn youtube_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>, CatalogError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/playlistItems?part=snippet&playlistId={}&maxResults=50",
                self.api_base, playlist_id
            );
            if let Some(token) = &page_token {
                url.push_str("&pageToken=");
                url.push_str(token);
            }

            let body = self.get_json(&url, "playlist items").await?;
            let (page, next) = parse_youtube_items(&body)?;
            items.extend(page);

            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(items)
    }

    async fn get_json(
        &self,
        url: &str,
        context: &'static str,
    ) -> Result<serde_json::Value, CatalogError> {
        let response = self.client.get(url).await?;

        if !response.status().is_success() {
            return Err(CatalogError::Upstream {
                status: response.status().as_u16(),
                context,
            });
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }
}

// Wire shapes. Only the fields the pipeline reads are modeled; everything
// else in the payloads is ignored.

#[derive(Deserialize)]
struct SpotifyPage<T> {
    items: Vec<T>,
    next: Option<String>,
}

#[derive(Deserialize)]
struct SpotifyImage {
    url: String,
}

#[derive(Deserialize)]
struct SpotifyPlaylist {
    id: String,
    name: String,
    tracks: SpotifyTrackRef,
    #[serde(default)]
    images: Option<Vec<SpotifyImage>>,
}

#[derive(Deserialize)]
struct SpotifyTrackRef {
    total: u64,
}

#[derive(Deserialize)]
struct SpotifyTrackEntry {
    track: Option<SpotifyTrack>,
}

#[derive(Deserialize)]
struct SpotifyTrack {
    // Local files have no catalog id and cannot be analyzed
    id: Option<String>,
    name: String,
    artists: Vec<SpotifyArtist>,
    duration_ms: Option<u64>,
    #[serde(default)]
    album: Option<SpotifyAlbum>,
}

#[derive(Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Deserialize)]
struct SpotifyAlbum {
    #[serde(default)]
    images: Option<Vec<SpotifyImage>>,
}

fn parse_spotify_user(body: &serde_json::Value) -> Result<PlatformUser, CatalogError> {
    #[derive(Deserialize)]
    struct Me {
        display_name: Option<String>,
        id: String,
        #[serde(default)]
        images: Option<Vec<SpotifyImage>>,
    }

    let me: Me = serde_json::from_value(body.clone())
        .map_err(|e| CatalogError::Parse(e.to_string()))?;
    Ok(PlatformUser {
        display_name: me.display_name.unwrap_or(me.id),
        avatar_url: me
            .images
            .and_then(|images| images.into_iter().next())
            .map(|image| image.url),
    })
}

fn parse_spotify_playlists(
    body: &serde_json::Value,
) -> Result<(Vec<Playlist>, Option<String>), CatalogError> {
    let page: SpotifyPage<SpotifyPlaylist> = serde_json::from_value(body.clone())
        .map_err(|e| CatalogError::Parse(e.to_string()))?;

    let playlists = page
        .items
        .into_iter()
        .map(|playlist| Playlist {
            id: playlist.id,
            name: playlist.name,
            item_count: Some(playlist.tracks.total),
            image_url: playlist
                .images
                .and_then(|images| images.into_iter().next())
                .map(|image| image.url),
        })
        .collect();

    Ok((playlists, page.next))
}

fn parse_spotify_tracks(
    body: &serde_json::Value,
) -> Result<(Vec<PlaylistItem>, Option<String>), CatalogError> {
    let page: SpotifyPage<SpotifyTrackEntry> = serde_json::from_value(body.clone())
        .map_err(|e| CatalogError::Parse(e.to_string()))?;

    let items = page
        .items
        .into_iter()
        .filter_map(|entry| entry.track)
        .filter_map(|track| {
            // Skip local files and unplayable entries with no catalog id
            let id = track.id?;
            Some(PlaylistItem {
                id,
                title: track.name,
                secondary_label: track
                    .artists
                    .iter()
                    .map(|artist| artist.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                duration_seconds: track.duration_ms.map(|ms| ms / 1000),
                thumbnail_url: track
                    .album
                    .and_then(|album| album.images)
                    .and_then(|images| images.into_iter().next())
                    .map(|image| image.url),
            })
        })
        .collect();

    Ok((items, page.next))
}

#[derive(Deserialize)]
struct YoutubePage<T> {
    items: Vec<T>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct YoutubeThumbnails {
    #[serde(default)]
    medium: Option<YoutubeThumbnail>,
    #[serde(default)]
    default: Option<YoutubeThumbnail>,
}

#[derive(Deserialize)]
struct YoutubeThumbnail {
    url: String,
}

impl YoutubeThumbnails {
    fn best(self) -> Option<String> {
        self.medium.or(self.default).map(|thumb| thumb.url)
    }
}

#[derive(Deserialize)]
struct YoutubePlaylist {
    id: String,
    snippet: YoutubePlaylistSnippet,
    #[serde(rename = "contentDetails")]
    content_details: YoutubePlaylistDetails,
}

#[derive(Deserialize)]
struct YoutubePlaylistSnippet {
    title: String,
    #[serde(default)]
    thumbnails: Option<YoutubeThumbnails>,
}

#[derive(Deserialize)]
struct YoutubePlaylistDetails {
    #[serde(rename = "itemCount")]
    item_count: u64,
}

#[derive(Deserialize)]
struct YoutubePlaylistItem {
    snippet: YoutubeItemSnippet,
}

#[derive(Deserialize)]
struct YoutubeItemSnippet {
    title: String,
    #[serde(rename = "videoOwnerChannelTitle")]
    video_owner_channel_title: Option<String>,
    #[serde(rename = "resourceId")]
    resource_id: YoutubeResourceId,
    #[serde(default)]
    thumbnails: Option<YoutubeThumbnails>,
}

#[derive(Deserialize)]
struct YoutubeResourceId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

fn parse_youtube_user(body: &serde_json::Value) -> Result<PlatformUser, CatalogError> {
    #[derive(Deserialize)]
    struct Channel {
        snippet: ChannelSnippet,
    }
    #[derive(Deserialize)]
    struct ChannelSnippet {
        title: String,
        #[serde(default)]
        thumbnails: Option<YoutubeThumbnails>,
    }

    let page: YoutubePage<Channel> = serde_json::from_value(body.clone())
        .map_err(|e| CatalogError::Parse(e.to_string()))?;

    let channel = page
        .items
        .into_iter()
        .next()
        .ok_or_else(|| CatalogError::Parse("no channel for account".to_string()))?;

    Ok(PlatformUser {
        display_name: channel.snippet.title,
        avatar_url: channel.snippet.thumbnails.and_then(YoutubeThumbnails::best),
    })
}

fn parse_youtube_playlists(
    body: &serde_json::Value,
) -> Result<(Vec<Playlist>, Option<String>), CatalogError> {
    let page: YoutubePage<YoutubePlaylist> = serde_json::from_value(body.clone())
        .map_err(|e| CatalogError::Parse(e.to_string()))?;

    let playlists = page
        .items
        .into_iter()
        .map(|playlist| Playlist {
            id: playlist.id,
            name: playlist.snippet.title,
            item_count: Some(playlist.content_details.item_count),
            image_url: playlist
                .snippet
                .thumbnails
                .and_then(YoutubeThumbnails::best),
        })
        .collect();

    Ok((playlists, page.next_page_token))
}

fn parse_youtube_items(
    body: &serde_json::Value,
) -> Result<(Vec<PlaylistItem>, Option<String>), CatalogError> {
    let page: YoutubePage<YoutubePlaylistItem> = serde_json::from_value(body.clone())
        .map_err(|e| CatalogError::Parse(e.to_string()))?;

    let items = page
        .items
        .into_iter()
        .filter_map(|item| {
            let snippet = item.snippet;
            // Deleted or private videos keep a row but lose their video id
            let id = snippet.resource_id.video_id?;
            if snippet.title == "Deleted video" || snippet.title == "Private video" {
                return None;
            }
            Some(PlaylistItem {
                id,
                title: snippet.title,
                secondary_label: snippet.video_owner_channel_title.unwrap_or_default(),
                duration_seconds: None,
                thumbnail_url: snippet.thumbnails.and_then(YoutubeThumbnails::best),
            })
        })
        .collect();

    Ok((items, page.next_page_token))
}
