//! Durable credential storage
//!
//! One access/refresh token pair per platform, persisted in the credentials
//! table so a connected platform survives a full process restart. No network
//! or validation logic lives here.

use moodlens_common::{Error, Platform, Result};
use sqlx::SqlitePool;

/// An OAuth access token with its optional refresh token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Durable key/value holder for one platform's TokenPair
#[derive(Debug, Clone)]
pub struct CredentialStore {
    db: SqlitePool,
    platform: Platform,
}

impl CredentialStore {
    pub fn new(db: SqlitePool, platform: Platform) -> Self {
        Self { db, platform }
    }

    /// Store a token pair, replacing any previous pair for this platform
    pub async fn put(&self, pair: &TokenPair) -> Result<()> {
        sqlx::query(
            "INSERT INTO credentials (platform, access_token, refresh_token, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(platform) DO UPDATE SET
                 access_token = excluded.access_token,
                 refresh_token = excluded.refresh_token,
                 updated_at = excluded.updated_at",
        )
        .bind(self.platform.key())
        .bind(&pair.access_token)
        .bind(&pair.refresh_token)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.db)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    /// Fetch the stored pair, if any
    pub async fn get(&self) -> Result<Option<TokenPair>> {
        let row: Option<(String, Option<String>)> = sqlx::query_as(
            "SELECT access_token, refresh_token FROM credentials WHERE platform = ?",
        )
        .bind(self.platform.key())
        .fetch_optional(&self.db)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|(access_token, refresh_token)| TokenPair {
            access_token,
            refresh_token,
        }))
    }

    /// Remove any stored pair; idempotent
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM credentials WHERE platform = ?")
            .bind(self.platform.key())
            .execute(&self.db)
            .await
            .map_err(Error::Database)?;

        Ok(())
    }
}
