//! Record store: durable home for saved analysis results
//!
//! Each saved record captures one item's profile at save time, including
//! whether the profile was the neutral default substituted for an
//! unavailable analysis. The store is behind a trait so the save action and
//! the HTTP handlers can be tested against it directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moodlens_common::{AxisProfile, Error, Platform, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl FromStr for Visibility {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(Error::InvalidInput(format!(
                "Unknown visibility: {}",
                other
            ))),
        }
    }
}

/// One persisted analysis result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedRecord {
    pub id: Uuid,
    pub owner: String,
    pub platform: Platform,
    pub item_id: String,
    pub title: String,
    pub secondary_label: String,
    pub thumbnail_url: Option<String>,
    pub profile: AxisProfile,
    /// True when the neutral default stood in for an unavailable analysis
    pub profile_defaulted: bool,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
}

/// Fields a PATCH may change
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordPatch {
    pub title: Option<String>,
    pub visibility: Option<Visibility>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn save(&self, record: &SavedRecord) -> Result<Uuid>;
    async fn list(&self, owner: &str) -> Result<Vec<SavedRecord>>;
    async fn list_public(&self, owner: &str) -> Result<Vec<SavedRecord>>;
    async fn get(&self, id: Uuid) -> Result<Option<SavedRecord>>;
    async fn update(&self, id: Uuid, patch: RecordPatch) -> Result<Option<SavedRecord>>;
    /// Returns false when no record had the id
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[derive(Clone)]
pub struct SqliteRecordStore {
    db: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

type RecordRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    bool,
    String,
    String,
);

fn row_to_record(row: RecordRow) -> Result<SavedRecord> {
    let (
        id,
        owner,
        platform,
        item_id,
        title,
        secondary_label,
        thumbnail_url,
        profile,
        profile_defaulted,
        visibility,
        created_at,
    ) = row;

    Ok(SavedRecord {
        id: Uuid::parse_str(&id)
            .map_err(|e| Error::Internal(format!("Bad record id {}: {}", id, e)))?,
        owner,
        platform: platform.parse()?,
        item_id,
        title,
        secondary_label,
        thumbnail_url,
        profile: serde_json::from_str(&profile)
            .map_err(|e| Error::Internal(format!("Bad stored profile: {}", e)))?,
        profile_defaulted,
        visibility: visibility.parse()?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| Error::Internal(format!("Bad record timestamp: {}", e)))?
            .with_timezone(&Utc),
    })
}

const SELECT_COLUMNS: &str = "id, owner, platform, item_id, title, secondary_label, \
     thumbnail_url, profile, profile_defaulted, visibility, created_at";

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn save(&self, record: &SavedRecord) -> Result<Uuid> {
        let profile = serde_json::to_string(&record.profile)
            .map_err(|e| Error::Internal(format!("Profile serialization failed: {}", e)))?;

        sqlx::query(
            "INSERT INTO saved_records
                 (id, owner, platform, item_id, title, secondary_label,
                  thumbnail_url, profile, profile_defaulted, visibility, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(&record.owner)
        .bind(record.platform.key())
        .bind(&record.item_id)
        .bind(&record.title)
        .bind(&record.secondary_label)
        .bind(&record.thumbnail_url)
        .bind(profile)
        .bind(record.profile_defaulted)
        .bind(record.visibility.as_str())
        .bind(record.created_at.to_rfc3339())
        .execute(&self.db)
        .await
        .map_err(Error::Database)?;

        Ok(record.id)
    }

    async fn list(&self, owner: &str) -> Result<Vec<SavedRecord>> {
        let rows: Vec<RecordRow> = sqlx::query_as(&format!(
            "SELECT {} FROM saved_records WHERE owner = ? ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(owner)
        .fetch_all(&self.db)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(row_to_record).collect()
    }

    async fn list_public(&self, owner: &str) -> Result<Vec<SavedRecord>> {
        let rows: Vec<RecordRow> = sqlx::query_as(&format!(
            "SELECT {} FROM saved_records
             WHERE owner = ? AND visibility = 'public'
             ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(owner)
        .fetch_all(&self.db)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(row_to_record).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<SavedRecord>> {
        let row: Option<RecordRow> = sqlx::query_as(&format!(
            "SELECT {} FROM saved_records WHERE id = ?",
            SELECT_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.db)
        .await
        .map_err(Error::Database)?;

        row.map(row_to_record).transpose()
    }

    async fn update(&self, id: Uuid, patch: RecordPatch) -> Result<Option<SavedRecord>> {
        let Some(mut record) = self.get(id).await? else {
            return Ok(None);
        };

        if let Some(title) = patch.title {
            record.title = title;
        }
        if let Some(visibility) = patch.visibility {
            record.visibility = visibility;
        }

        sqlx::query("UPDATE saved_records SET title = ?, visibility = ? WHERE id = ?")
            .bind(&record.title)
            .bind(record.visibility.as_str())
            .bind(id.to_string())
            .execute(&self.db)
            .await
            .map_err(Error::Database)?;

        Ok(Some(record))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM saved_records WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.db)
            .await
            .map_err(Error::Database)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_store() -> SqliteRecordStore {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        moodlens_common::db::init_tables(&pool).await.unwrap();
        SqliteRecordStore::new(pool)
    }

    fn record(owner: &str, item_id: &str, visibility: Visibility) -> SavedRecord {
        SavedRecord {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            platform: Platform::Spotify,
            item_id: item_id.to_string(),
            title: "A Song".into(),
            secondary_label: "An Artist".into(),
            thumbnail_url: Some("https://img/1".into()),
            profile: AxisProfile::clamped(0.1, 0.2, 0.3, 0.4, 0.5, 0.6),
            profile_defaulted: false,
            visibility,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_then_get_roundtrips() {
        let store = setup_store().await;
        let original = record("alice", "t1", Visibility::Private);

        let id = store.save(&original).await.unwrap();
        let loaded = store.get(id).await.unwrap().unwrap();

        assert_eq!(loaded.item_id, "t1");
        assert_eq!(loaded.platform, Platform::Spotify);
        assert_eq!(loaded.profile, original.profile);
        assert!(!loaded.profile_defaulted);
    }

    #[tokio::test]
    async fn list_public_filters_visibility() {
        let store = setup_store().await;
        store
            .save(&record("alice", "t1", Visibility::Public))
            .await
            .unwrap();
        store
            .save(&record("alice", "t2", Visibility::Private))
            .await
            .unwrap();
        store
            .save(&record("bob", "t3", Visibility::Public))
            .await
            .unwrap();

        assert_eq!(store.list("alice").await.unwrap().len(), 2);

        let public = store.list_public("alice").await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].item_id, "t1");
    }

    #[tokio::test]
    async fn update_changes_title_and_visibility() {
        let store = setup_store().await;
        let id = store
            .save(&record("alice", "t1", Visibility::Private))
            .await
            .unwrap();

        let updated = store
            .update(
                id,
                RecordPatch {
                    title: Some("Renamed".into()),
                    visibility: Some(Visibility::Public),
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.visibility, Visibility::Public);

        let reloaded = store.get(id).await.unwrap().unwrap();
        assert_eq!(reloaded.title, "Renamed");
    }

    #[tokio::test]
    async fn update_missing_record_is_none() {
        let store = setup_store().await;
        let result = store
            .update(Uuid::new_v4(), RecordPatch::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let store = setup_store().await;
        let id = store
            .save(&record("alice", "t1", Visibility::Private))
            .await
            .unwrap();

        assert!(store.delete(id).await.unwrap());
        assert!(!store.delete(id).await.unwrap());
        assert!(store.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn defaulted_profile_is_preserved() {
        let store = setup_store().await;
        let mut r = record("alice", "t1", Visibility::Private);
        r.profile = AxisProfile::NEUTRAL;
        r.profile_defaulted = true;

        let id = store.save(&r).await.unwrap();
        let loaded = store.get(id).await.unwrap().unwrap();
        assert!(loaded.profile_defaulted);
        assert_eq!(loaded.profile, AxisProfile::NEUTRAL);
    }
}
