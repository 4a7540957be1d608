//! Bodies of the periodic jobs: fetch, validate, gate, upsert.

use super::scheduler::{SyncState, TaskKind, TickOutcome};
use crate::clock::Clock;
use crate::config::SyncConfig;
use crate::db::{Direction, PositionField, RecordStore};
use crate::error::OrbitError;
use crate::retention::RetentionManager;
use crate::upstream::TelemetrySource;
use orbitcache_gaps::{GapAnalyzer, GapFill};
use orbitcache_schema::{TleRecord, TleSource, validate_crew, validate_position, validate_tle};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Everything a tick needs, shared by all spawned runs.
#[derive(Clone)]
pub struct SyncContext {
    pub store: RecordStore,
    pub source: Arc<dyn TelemetrySource>,
    pub analyzer: GapAnalyzer,
    pub retention: RetentionManager,
    pub clock: Arc<dyn Clock>,
    pub config: SyncConfig,
}

/// Read side of the manager's `(state, epoch)` channel.
#[derive(Clone)]
pub(crate) struct SessionGate {
    rx: watch::Receiver<(SyncState, u64)>,
}

impl SessionGate {
    pub(crate) fn new(rx: watch::Receiver<(SyncState, u64)>) -> Self {
        Self { rx }
    }

    /// Writes are allowed only while the session that started the run is
    /// still running.
    pub(crate) fn is_open(&self, epoch: u64) -> bool {
        *self.rx.borrow() == (SyncState::Running, epoch)
    }
}

enum Written {
    Stored,
    Discarded,
    /// Upstream had nothing better than what is cached; nothing written.
    KeptCached,
}

pub(crate) async fn run_task(
    kind: TaskKind,
    ctx: &SyncContext,
    gate: &SessionGate,
    epoch: u64,
) -> TickOutcome {
    let result = match kind {
        TaskKind::Position => sync_position(ctx, gate, epoch).await,
        TaskKind::Crew => sync_crew(ctx, gate, epoch).await,
        TaskKind::Tle => sync_tle(ctx, gate, epoch).await,
        TaskKind::Retention => run_retention(ctx, gate, epoch).await,
    };

    match result {
        Ok(Written::Stored) => TickOutcome::Succeeded,
        Ok(Written::Discarded) => {
            debug!(task = %kind, epoch, "session ended mid-run; result discarded");
            TickOutcome::Discarded
        }
        Ok(Written::KeptCached) => TickOutcome::Failed,
        Err(OrbitError::Validation(e)) => {
            warn!(task = %kind, error = %e, "dropping invalid upstream payload");
            TickOutcome::Failed
        }
        Err(e) => {
            warn!(task = %kind, error = %e, "sync tick failed");
            TickOutcome::Failed
        }
    }
}

async fn sync_position(
    ctx: &SyncContext,
    gate: &SessionGate,
    epoch: u64,
) -> Result<Written, OrbitError> {
    let payload = ctx.source.fetch_position().await?;
    let record = validate_position(&payload)?;
    if !gate.is_open(epoch) {
        return Ok(Written::Discarded);
    }

    let timestamp = record.timestamp_seconds;
    ctx.store.positions.insert(record).await?;
    ctx.store.metadata.record_fetch(ctx.clock.now()).await?;
    debug!(timestamp, "position stored");

    // Filler is best effort; the observed sample is already safe.
    if let Err(e) = fill_recent_gaps(ctx, gate, epoch).await {
        warn!(error = %e, "gap fill failed");
    }
    Ok(Written::Stored)
}

async fn fill_recent_gaps(
    ctx: &SyncContext,
    gate: &SessionGate,
    epoch: u64,
) -> Result<u64, OrbitError> {
    let mut recent = ctx
        .store
        .positions
        .query()
        .order_by(PositionField::Timestamp, Direction::Desc)
        .limit(ctx.config.gap_scan_window)
        .execute()
        .await?;
    recent.reverse();

    let gaps = ctx.analyzer.detect_open_gaps(&recent);
    if gaps.is_empty() {
        return Ok(0);
    }

    // Fetched once, and only if some gap needs propagation.
    let mut tle: Option<Option<TleRecord>> = None;
    let mut fillers = Vec::new();
    for gap in &gaps {
        if gap.info.use_orbital_calculation && tle.is_none() {
            tle = Some(ctx.store.tles.latest().await?);
        }
        match ctx.analyzer.fill_gap(gap, tle.as_ref().and_then(Option::as_ref))? {
            GapFill::Skipped(reason) => {
                debug!(
                    start = gap.info.start_timestamp,
                    end = gap.info.end_timestamp,
                    ?reason,
                    "gap left open"
                );
            }
            fill => fillers.extend(fill.into_records()),
        }
    }

    if fillers.is_empty() || !gate.is_open(epoch) {
        return Ok(0);
    }
    let synthesized = fillers.len();
    let inserted = ctx.store.positions.bulk_insert(fillers).await?;
    info!(gaps = gaps.len(), synthesized, inserted, "filled position gaps");
    Ok(inserted)
}

async fn sync_crew(ctx: &SyncContext, gate: &SessionGate, epoch: u64) -> Result<Written, OrbitError> {
    let payload = ctx.source.fetch_crew().await?;
    let roster = validate_crew(&payload, ctx.clock.now_seconds())?;
    if !gate.is_open(epoch) {
        return Ok(Written::Discarded);
    }

    let size = ctx.store.crew.replace_all(roster).await?;
    ctx.store.metadata.record_fetch(ctx.clock.now()).await?;
    debug!(size, "crew roster replaced");
    Ok(Written::Stored)
}

async fn sync_tle(ctx: &SyncContext, gate: &SessionGate, epoch: u64) -> Result<Written, OrbitError> {
    let raw = ctx.source.fetch_tle().await?;
    if raw.source == TleSource::Fallback
        && let Some(cached) = ctx.store.tles.latest().await?
    {
        warn!(
            cached_source = %cached.source,
            cached_fetched_at = cached.fetched_at,
            "TLE upstreams unavailable; keeping cached element set"
        );
        return Ok(Written::KeptCached);
    }
    let record = validate_tle(&raw.text, raw.source, ctx.clock.now_seconds())?;
    if !gate.is_open(epoch) {
        return Ok(Written::Discarded);
    }

    let source = record.source;
    ctx.store.tles.insert(record).await?;
    ctx.store.metadata.record_fetch(ctx.clock.now()).await?;
    debug!(%source, "element set stored");
    Ok(Written::Stored)
}

async fn run_retention(
    ctx: &SyncContext,
    gate: &SessionGate,
    epoch: u64,
) -> Result<Written, OrbitError> {
    if !gate.is_open(epoch) {
        return Ok(Written::Discarded);
    }
    let results = ctx.retention.run_cleanup().await;
    let deleted: u64 = results.iter().map(|r| r.deleted).sum();
    debug!(deleted, "scheduled retention pass finished");
    Ok(Written::Stored)
}
