use crate::clock::Clock;
use crate::config::RetentionConfig;
use crate::db::{Collection, CollectionHandle, RecordStore};
use crate::error::OrbitError;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Position,
    Tle,
    Crew,
    Briefing,
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CollectionKind::Position => "position",
            CollectionKind::Tle => "tle",
            CollectionKind::Crew => "crew",
            CollectionKind::Briefing => "briefing",
        })
    }
}

/// Outcome of one collection's pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResult {
    pub kind: CollectionKind,
    pub deleted: u64,
    pub duration_ms: u64,
}

#[derive(Clone)]
pub struct RetentionManager {
    store: RecordStore,
    config: RetentionConfig,
    clock: Arc<dyn Clock>,
}

impl RetentionManager {
    pub fn new(store: RecordStore, config: RetentionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    /// Scheduled pass. A failing collection is logged and skipped until the
    /// next interval; the remaining collections still run.
    pub async fn run_cleanup(&self) -> Vec<CleanupResult> {
        let mut results = Vec::with_capacity(4);
        for kind in [
            CollectionKind::Position,
            CollectionKind::Tle,
            CollectionKind::Crew,
            CollectionKind::Briefing,
        ] {
            match self.clean_kind(kind).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(collection = %kind, error = %e, "retention pass failed; retrying next interval");
                }
            }
        }
        self.stamp().await;
        results
    }

    /// Manual pass; the first storage error is returned to the caller.
    pub async fn run_cleanup_checked(&self) -> Result<Vec<CleanupResult>, OrbitError> {
        let mut results = Vec::with_capacity(4);
        for kind in [
            CollectionKind::Position,
            CollectionKind::Tle,
            CollectionKind::Crew,
            CollectionKind::Briefing,
        ] {
            results.push(self.clean_kind(kind).await?);
        }
        self.store.metadata.record_cleanup(self.clock.now()).await?;
        Ok(results)
    }

    async fn stamp(&self) {
        if let Err(e) = self.store.metadata.record_cleanup(self.clock.now()).await {
            warn!(error = %e, "failed to record cleanup time");
        }
    }

    async fn clean_kind(&self, kind: CollectionKind) -> Result<CleanupResult, OrbitError> {
        let cfg = &self.config;
        match kind {
            CollectionKind::Position => {
                self.clean(kind, &self.store.positions, cfg.max_records).await
            }
            CollectionKind::Tle => self.clean(kind, &self.store.tles, cfg.tle_max_records).await,
            CollectionKind::Crew => self.clean(kind, &self.store.crew, cfg.crew_max_records).await,
            CollectionKind::Briefing => {
                self.clean(kind, &self.store.briefings, cfg.briefing_max_records)
                    .await
            }
        }
    }

    async fn clean<C: Collection>(
        &self,
        kind: CollectionKind,
        handle: &CollectionHandle<C>,
        max_records: u64,
    ) -> Result<CleanupResult, OrbitError> {
        let started = Instant::now();
        let batch = self.config.cleanup_batch_size.max(1);
        let cutoff = self.clock.now_seconds() - self.config.max_age_seconds();

        let mut by_age: u64 = 0;
        loop {
            let deleted = handle.evict_older_than(cutoff, batch).await?;
            by_age += deleted;
            if deleted < u64::from(batch) {
                break;
            }
        }

        let mut by_count: u64 = 0;
        loop {
            let count = handle.count().await?;
            if count <= max_records {
                break;
            }
            let excess = (count - max_records).min(u64::from(batch)) as u32;
            let deleted = handle.evict_oldest(excess).await?;
            by_count += deleted;
            if deleted == 0 {
                // Only the newest generation is left.
                break;
            }
        }

        let result = CleanupResult {
            kind,
            deleted: by_age + by_count,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        if result.deleted > 0 {
            info!(
                collection = %kind,
                by_age,
                by_count,
                duration_ms = result.duration_ms,
                "retention pass evicted records"
            );
        } else {
            debug!(collection = %kind, "retention pass: nothing to evict");
        }
        Ok(result)
    }
}
