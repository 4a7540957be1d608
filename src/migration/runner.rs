use super::legacy::{LegacyCrew, LegacyPosition, LegacySnapshot, LegacyStore, LegacyTle};
use crate::clock::Clock;
use crate::db::{CURRENT_SCHEMA_VERSION, RecordStore};
use crate::error::OrbitError;
use orbitcache_schema::{
    BriefingRecord, CrewManifest, CrewRecord, PositionPayload, PositionRecord, TleRecord,
    TleSource, ValidationError, validate_crew, validate_position_payload, validate_tle_lines,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InsertCount {
    pub inserted: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub success: bool,
    pub positions: InsertCount,
    pub crew: InsertCount,
    pub tle: InsertCount,
    pub briefings: InsertCount,
    /// Legacy records dropped because they fail current validation.
    pub skipped: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Failed migration outcome kept around for the UI until dismissed.
#[derive(Debug, Clone, Default)]
pub struct MigrationNotice {
    inner: Arc<RwLock<Option<MigrationResult>>>,
}

impl MigrationNotice {
    pub async fn publish(&self, result: &MigrationResult) {
        if !result.success {
            *self.inner.write().await = Some(result.clone());
        }
    }

    pub async fn current(&self) -> Option<MigrationResult> {
        self.inner.read().await.clone()
    }

    /// Returns whether a notice was showing.
    pub async fn dismiss(&self) -> bool {
        self.inner.write().await.take().is_some()
    }
}

pub struct MigrationRunner {
    store: RecordStore,
    legacy: Arc<dyn LegacyStore>,
    clock: Arc<dyn Clock>,
}

impl MigrationRunner {
    pub fn new(store: RecordStore, legacy: Arc<dyn LegacyStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            legacy,
            clock,
        }
    }

    pub async fn is_migration_complete(&self) -> Result<bool, OrbitError> {
        self.store.metadata.is_migration_complete().await
    }

    /// Copy every legacy record into the store.
    ///
    /// Safe to re-run: inserts upsert by key, so a second pass only rewrites
    /// the same rows. On failure the completion flag stays unset and the
    /// counts reflect what landed before the error.
    pub async fn run_migration(&self) -> MigrationResult {
        let mut result = MigrationResult::default();
        match self.migrate(&mut result).await {
            Ok(()) => {
                result.success = true;
                info!(
                    positions = result.positions.inserted,
                    crew = result.crew.inserted,
                    tle = result.tle.inserted,
                    briefings = result.briefings.inserted,
                    skipped = result.skipped,
                    "migration complete"
                );
            }
            Err(e) => {
                warn!(error = %e, "migration failed; will retry on next start");
                result.success = false;
                result.error = Some(e.to_string());
            }
        }
        result
    }

    async fn migrate(&self, result: &mut MigrationResult) -> Result<(), OrbitError> {
        if self.is_migration_complete().await? {
            debug!("migration already complete");
            return Ok(());
        }

        let snapshot = self.legacy.load().await?;
        let LegacySnapshot {
            positions,
            crew,
            tle,
            briefings,
        } = snapshot;

        let positions = keep_valid(positions, map_position, &mut result.skipped);
        result.positions.inserted = self.store.positions.bulk_insert(positions).await?;

        let crew = keep_valid(crew, map_crew, &mut result.skipped);
        result.crew.inserted = self.store.crew.bulk_insert(crew).await?;

        let tle = keep_valid(tle, map_tle, &mut result.skipped);
        result.tle.inserted = self.store.tles.bulk_insert(tle).await?;

        let briefings: Vec<BriefingRecord> = briefings
            .into_iter()
            .filter_map(|b| {
                if b.content.trim().is_empty() {
                    result.skipped += 1;
                    return None;
                }
                Some(BriefingRecord {
                    id: b.id,
                    generated_at: millis_to_seconds(b.generated_at),
                    title: b.title,
                    content: b.content,
                })
            })
            .collect();
        result.briefings.inserted = self.store.briefings.bulk_insert(briefings).await?;

        self.store
            .metadata
            .mark_migration_complete(self.clock.now(), CURRENT_SCHEMA_VERSION)
            .await
    }
}

fn keep_valid<L, R>(
    legacy: Vec<L>,
    map: impl Fn(L) -> Result<R, ValidationError>,
    skipped: &mut u64,
) -> Vec<R> {
    legacy
        .into_iter()
        .filter_map(|item| match map(item) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(error = %e, "skipping legacy record");
                *skipped += 1;
                None
            }
        })
        .collect()
}

fn millis_to_seconds(ms: i64) -> i64 {
    ms.div_euclid(1000)
}

fn map_position(legacy: LegacyPosition) -> Result<PositionRecord, ValidationError> {
    validate_position_payload(PositionPayload {
        latitude: legacy.lat,
        longitude: legacy.lng,
        altitude: legacy.altitude,
        velocity: legacy.velocity,
        visibility: legacy.visibility,
        timestamp: millis_to_seconds(legacy.timestamp),
    })
}

fn map_crew(legacy: LegacyCrew) -> Result<CrewRecord, ValidationError> {
    let manifest = CrewManifest {
        message: None,
        number: None,
        people: vec![legacy.member],
    };
    let payload =
        serde_json::to_value(manifest).map_err(|e| ValidationError::Malformed {
            entity: "crew",
            message: e.to_string(),
        })?;
    validate_crew(&payload, millis_to_seconds(legacy.fetched_at))?
        .pop()
        .ok_or(ValidationError::Missing {
            entity: "crew",
            field: "people",
        })
}

fn map_tle(legacy: LegacyTle) -> Result<TleRecord, ValidationError> {
    let source = legacy
        .source
        .as_deref()
        .and_then(|s| s.parse::<TleSource>().ok())
        .unwrap_or(TleSource::Primary);
    validate_tle_lines(
        &legacy.line1,
        &legacy.line2,
        source,
        millis_to_seconds(legacy.fetched_at),
    )
}
