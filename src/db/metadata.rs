use super::models::StorageMetadata;
use crate::error::OrbitError;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

/// Reads and writes the singleton `storage_metadata` row.
///
/// Single-row `UPDATE`s are atomic in SQLite, so this talks to the pool
/// directly instead of going through an actor mailbox.
#[derive(Clone)]
pub struct MetadataStore {
    pool: SqlitePool,
}

impl MetadataStore {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self) -> Result<StorageMetadata, OrbitError> {
        let row = sqlx::query_as::<_, StorageMetadata>(
            r#"
            SELECT id, initialized, last_fetch_at, last_cleanup_at, schema_version,
                   position_count, migration_completed_at
            FROM storage_metadata
            WHERE id = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn record_fetch(&self, at: DateTime<Utc>) -> Result<(), OrbitError> {
        sqlx::query("UPDATE storage_metadata SET last_fetch_at = ? WHERE id = 1")
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn record_cleanup(&self, at: DateTime<Utc>) -> Result<(), OrbitError> {
        sqlx::query("UPDATE storage_metadata SET last_cleanup_at = ? WHERE id = 1")
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Persist the migration completion flag together with the schema version.
    pub async fn mark_migration_complete(
        &self,
        at: DateTime<Utc>,
        schema_version: i64,
    ) -> Result<(), OrbitError> {
        sqlx::query(
            "UPDATE storage_metadata SET migration_completed_at = ?, schema_version = ? WHERE id = 1",
        )
        .bind(at)
        .bind(schema_version)
        .execute(&self.pool)
        .await?;
        debug!(schema_version, "migration completion recorded");
        Ok(())
    }

    pub async fn is_migration_complete(&self) -> Result<bool, OrbitError> {
        let done: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT migration_completed_at FROM storage_metadata WHERE id = 1",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(done.is_some())
    }
}
