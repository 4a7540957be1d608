use crate::error::OrbitError;
use chrono::{DateTime, Utc};
use orbitcache_schema::{BriefingRecord, CrewRecord, PositionRecord, TleRecord};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct DbPosition {
    pub id: String,
    pub timestamp_seconds: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_km: f64,
    pub velocity_kmh: f64,
    pub visibility: String,
    pub origin: String,
}

impl TryFrom<DbPosition> for PositionRecord {
    type Error = OrbitError;

    fn try_from(row: DbPosition) -> Result<Self, Self::Error> {
        Ok(PositionRecord {
            origin: row.origin.parse().map_err(|e: String| {
                OrbitError::Storage(sqlx::Error::Decode(e.into()))
            })?,
            id: row.id,
            latitude: row.latitude,
            longitude: row.longitude,
            timestamp_seconds: row.timestamp_seconds,
            altitude_km: row.altitude_km,
            velocity_kmh: row.velocity_kmh,
            visibility: row.visibility,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbCrew {
    pub id: String,
    pub name: String,
    pub craft: String,
    pub image: Option<String>,
    pub role: Option<String>,
    pub agency: Option<String>,
    pub launch_date: Option<String>,
    pub end_date: Option<String>,
    pub fetched_at: i64,
}

impl From<DbCrew> for CrewRecord {
    fn from(row: DbCrew) -> Self {
        CrewRecord {
            id: row.id,
            name: row.name,
            craft: row.craft,
            image: row.image,
            role: row.role,
            agency: row.agency,
            launch_date: row.launch_date,
            end_date: row.end_date,
            fetched_at: row.fetched_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTle {
    pub id: String,
    pub line1: String,
    pub line2: String,
    pub fetched_at: i64,
    pub source: String,
}

impl TryFrom<DbTle> for TleRecord {
    type Error = OrbitError;

    fn try_from(row: DbTle) -> Result<Self, Self::Error> {
        Ok(TleRecord {
            source: row.source.parse().map_err(|e: String| {
                OrbitError::Storage(sqlx::Error::Decode(e.into()))
            })?,
            id: row.id,
            line1: row.line1,
            line2: row.line2,
            fetched_at: row.fetched_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbBriefing {
    pub id: String,
    pub generated_at: i64,
    pub title: Option<String>,
    pub content: String,
}

impl From<DbBriefing> for BriefingRecord {
    fn from(row: DbBriefing) -> Self {
        BriefingRecord {
            id: row.id,
            generated_at: row.generated_at,
            title: row.title,
            content: row.content,
        }
    }
}

/// The singleton `storage_metadata` row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StorageMetadata {
    pub id: i64,
    pub initialized: bool,
    pub last_fetch_at: Option<DateTime<Utc>>,
    pub last_cleanup_at: Option<DateTime<Utc>>,
    pub schema_version: i64,
    /// Maintained incrementally; approximate after crashes.
    pub position_count: Option<i64>,
    pub migration_completed_at: Option<DateTime<Utc>>,
}
