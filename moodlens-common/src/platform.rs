//! Streaming platform identity
//!
//! Two platforms run the identical pipeline shape independently; this enum
//! keys all per-platform state (credentials, sessions, batch runs).

use serde::{Deserialize, Serialize};

/// Supported streaming platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Spotify,
    Youtube,
}

impl Platform {
    /// All supported platforms
    pub const ALL: [Platform; 2] = [Platform::Spotify, Platform::Youtube];

    /// Stable lowercase key used in routes and storage
    pub fn key(&self) -> &'static str {
        match self {
            Platform::Spotify => "spotify",
            Platform::Youtube => "youtube",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for Platform {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spotify" => Ok(Platform::Spotify),
            "youtube" => Ok(Platform::Youtube),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown platform: {}",
                other
            ))),
        }
    }
}
