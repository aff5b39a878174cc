//! Database bootstrap for moodlens services
//!
//! All durable state lives in a single SQLite database in the root folder:
//! platform credentials, saved records, and key/value settings.

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Connects to moodlens.db at the given path, creating it if missing, and
/// bootstraps the schema.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create moodlens tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    // Key/value settings (client credentials, tunables)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One credential pair per platform
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS credentials (
            platform TEXT PRIMARY KEY,
            access_token TEXT NOT NULL,
            refresh_token TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Persisted analysis records
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS saved_records (
            id TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            platform TEXT NOT NULL,
            item_id TEXT NOT NULL,
            title TEXT NOT NULL,
            secondary_label TEXT NOT NULL,
            thumbnail_url TEXT,
            profile TEXT NOT NULL,
            profile_defaulted INTEGER NOT NULL DEFAULT 0,
            visibility TEXT NOT NULL DEFAULT 'private',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_saved_records_owner ON saved_records(owner)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
