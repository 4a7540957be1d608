use crate::error::OrbitError;
use async_trait::async_trait;
use orbitcache_schema::CrewMember;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info};

/// Position sample as the old client persisted it: millisecond timestamps and
/// `lat`/`lng` naming. Its old id is not carried over; records are re-keyed
/// by timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyPosition {
    pub lat: f64,
    pub lng: f64,
    /// Unix milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub altitude: f64,
    #[serde(default)]
    pub velocity: f64,
    #[serde(default)]
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyCrew {
    #[serde(flatten)]
    pub member: CrewMember,
    /// Unix milliseconds.
    pub fetched_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTle {
    pub line1: String,
    pub line2: String,
    /// Unix milliseconds.
    pub fetched_at: i64,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyBriefing {
    pub id: String,
    /// Unix milliseconds.
    pub generated_at: i64,
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacySnapshot {
    pub positions: Vec<LegacyPosition>,
    pub crew: Vec<LegacyCrew>,
    pub tle: Vec<LegacyTle>,
    pub briefings: Vec<LegacyBriefing>,
}

impl LegacySnapshot {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
            && self.crew.is_empty()
            && self.tle.is_empty()
            && self.briefings.is_empty()
    }
}

/// Source of legacy records.
#[async_trait]
pub trait LegacyStore: Send + Sync {
    async fn load(&self) -> Result<LegacySnapshot, OrbitError>;
}

/// Reads the snapshot from a JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonLegacyStore {
    path: PathBuf,
}

impl JsonLegacyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn unreadable(&self, e: impl std::fmt::Display) -> OrbitError {
        OrbitError::Migration(format!("legacy snapshot {}: {e}", self.path.display()))
    }
}

#[async_trait]
impl LegacyStore for JsonLegacyStore {
    async fn load(&self) -> Result<LegacySnapshot, OrbitError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no legacy snapshot on disk");
                return Ok(LegacySnapshot::default());
            }
            Err(e) => return Err(self.unreadable(e)),
        };
        let snapshot: LegacySnapshot =
            serde_json::from_slice(&bytes).map_err(|e| self.unreadable(e))?;
        info!(
            path = %self.path.display(),
            positions = snapshot.positions.len(),
            crew = snapshot.crew.len(),
            tle = snapshot.tle.len(),
            briefings = snapshot.briefings.len(),
            "legacy snapshot loaded"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reads_camel_case_fields() {
        let raw = r#"{
            "positions": [{"lat": 10.5, "lng": -20.25, "timestamp": 1700000000000, "altitude": 420.0, "velocity": 27600.0}],
            "crew": [{"name": "Jane Doe", "craft": "ISS", "launchDate": "2024-01-01", "fetchedAt": 1700000000000}],
            "tle": [],
            "briefings": [{"id": "b1", "generatedAt": 1700000000000, "content": "hello"}]
        }"#;
        let snapshot: LegacySnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snapshot.positions[0].lng, -20.25);
        assert_eq!(snapshot.crew[0].member.launch_date.as_deref(), Some("2024-01-01"));
        assert_eq!(snapshot.crew[0].fetched_at, 1_700_000_000_000);
        assert!(snapshot.tle.is_empty());
        assert_eq!(snapshot.briefings[0].title, None);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let snapshot: LegacySnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.is_empty());
    }
}
