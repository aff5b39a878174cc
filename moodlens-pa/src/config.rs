//! Configuration resolution for moodlens-pa
//!
//! Provides multi-tier configuration resolution with Database → ENV → TOML
//! priority for OAuth application credentials and service URLs.

use moodlens_common::config::TomlConfig;
use moodlens_common::{Error, Platform, Result};
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};

/// Resolved OAuth application registration for one platform
#[derive(Debug, Clone)]
pub struct OAuthAppConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub frontend_url: String,
    pub analysis_service_url: String,
}

/// Validate a credential value (non-empty, non-whitespace)
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Generic setting getter against the settings table
pub async fn get_setting(db: &Pool<Sqlite>, key: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    Ok(row.map(|(value,)| value))
}

/// Generic setting setter against the settings table (UPSERT)
pub async fn set_setting(db: &Pool<Sqlite>, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

/// Resolve one credential field with Database → ENV → TOML priority
async fn resolve_field(
    db: &Pool<Sqlite>,
    db_key: &str,
    env_var: &str,
    toml_value: Option<&String>,
) -> Result<Option<String>> {
    let db_value = get_setting(db, db_key).await?.filter(|v| is_valid_value(v));
    let env_value = std::env::var(env_var).ok().filter(|v| is_valid_value(v));
    let toml_value = toml_value.filter(|v| is_valid_value(v)).cloned();

    let mut sources = Vec::new();
    if db_value.is_some() {
        sources.push("database");
    }
    if env_value.is_some() {
        sources.push("environment");
    }
    if toml_value.is_some() {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            db_key,
            sources.join(", "),
            sources[0]
        );
    }

    Ok(db_value.or(env_value).or(toml_value))
}

/// Resolve the OAuth application config for one platform
///
/// client_id and client_secret are required; redirect_uri falls back to the
/// service's own callback route.
pub async fn resolve_oauth_config(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
    platform: Platform,
    listen_port: u16,
) -> Result<OAuthAppConfig> {
    let toml_creds = match platform {
        Platform::Spotify => &toml_config.spotify,
        Platform::Youtube => &toml_config.youtube,
    };
    let env_prefix = match platform {
        Platform::Spotify => "MOODLENS_SPOTIFY",
        Platform::Youtube => "MOODLENS_YOUTUBE",
    };

    let client_id = resolve_field(
        db,
        &format!("{}.client_id", platform.key()),
        &format!("{}_CLIENT_ID", env_prefix),
        toml_creds.client_id.as_ref(),
    )
    .await?
    .ok_or_else(|| {
        Error::Config(format!(
            "{} client id not configured. Set {}_CLIENT_ID, the '{}.client_id' setting, \
             or the [{}] section of the TOML config.",
            platform,
            env_prefix,
            platform.key(),
            platform.key()
        ))
    })?;

    let client_secret = resolve_field(
        db,
        &format!("{}.client_secret", platform.key()),
        &format!("{}_CLIENT_SECRET", env_prefix),
        toml_creds.client_secret.as_ref(),
    )
    .await?
    .ok_or_else(|| {
        Error::Config(format!("{} client secret not configured", platform))
    })?;

    let redirect_uri = resolve_field(
        db,
        &format!("{}.redirect_uri", platform.key()),
        &format!("{}_REDIRECT_URI", env_prefix),
        toml_creds.redirect_uri.as_ref(),
    )
    .await?
    .unwrap_or_else(|| {
        format!(
            "http://localhost:{}/api/{}/callback",
            listen_port,
            platform.key()
        )
    });

    info!(platform = %platform, "OAuth application credentials resolved");

    Ok(OAuthAppConfig {
        client_id,
        client_secret,
        redirect_uri,
    })
}

/// Resolve frontend and analysis service URLs
pub async fn resolve_service_config(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<ServiceConfig> {
    let frontend_url = resolve_field(
        db,
        "frontend_url",
        "MOODLENS_FRONTEND_URL",
        toml_config.frontend_url.as_ref(),
    )
    .await?
    .unwrap_or_else(|| "http://localhost:3000".to_string());

    let analysis_service_url = resolve_field(
        db,
        "analysis_service_url",
        "MOODLENS_ANALYSIS_URL",
        toml_config.analysis_service_url.as_ref(),
    )
    .await?
    .unwrap_or_else(|| "http://localhost:5802".to_string());

    Ok(ServiceConfig {
        frontend_url,
        analysis_service_url,
    })
}
