//! Read-only cache queries for the UI.

use crate::db::{CrewField, Direction, Op, PositionField};
use crate::error::OrbitError;
use crate::server::router::OrbitState;
use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use orbitcache_schema::{CrewRecord, PositionRecord, TleRecord};
use serde::Deserialize;

const DEFAULT_POSITION_LIMIT: u32 = 1_000;
const MAX_POSITION_LIMIT: u32 = 10_000;

pub fn router() -> Router<OrbitState> {
    Router::new()
        .route("/api/positions", get(positions_range))
        .route("/api/positions/latest", get(position_latest))
        .route("/api/crew", get(crew_roster))
        .route("/api/tle/latest", get(tle_latest))
}

#[derive(Debug, Default, Deserialize)]
pub struct PositionRange {
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub limit: Option<u32>,
    pub order: Option<Direction>,
}

/// GET /api/positions?from&to&limit&order
///
/// Bounds are unix seconds, inclusive on both ends.
async fn positions_range(
    State(state): State<OrbitState>,
    Query(range): Query<PositionRange>,
) -> Result<Json<Vec<PositionRecord>>, OrbitError> {
    if let (Some(from), Some(to)) = (range.from, range.to)
        && from > to
    {
        return Err(OrbitError::InvalidQuery(format!(
            "`from` ({from}) is after `to` ({to})"
        )));
    }
    let limit = range.limit.unwrap_or(DEFAULT_POSITION_LIMIT);
    if limit == 0 || limit > MAX_POSITION_LIMIT {
        return Err(OrbitError::InvalidQuery(format!(
            "`limit` must be between 1 and {MAX_POSITION_LIMIT}"
        )));
    }

    let mut query = state.store.positions.query();
    if let Some(from) = range.from {
        query = query.filter(PositionField::Timestamp, Op::Ge, from);
    }
    if let Some(to) = range.to {
        query = query.filter(PositionField::Timestamp, Op::Le, to);
    }
    let records = query
        .order_by(PositionField::Timestamp, range.order.unwrap_or_default())
        .limit(limit)
        .execute()
        .await?;
    Ok(Json(records))
}

async fn position_latest(
    State(state): State<OrbitState>,
) -> Result<Json<PositionRecord>, OrbitError> {
    state
        .store
        .positions
        .latest()
        .await?
        .map(Json)
        .ok_or(OrbitError::NotFound("position"))
}

async fn crew_roster(State(state): State<OrbitState>) -> Result<Json<Vec<CrewRecord>>, OrbitError> {
    let roster = state
        .store
        .crew
        .query()
        .order_by(CrewField::Name, Direction::Asc)
        .execute()
        .await?;
    Ok(Json(roster))
}

async fn tle_latest(State(state): State<OrbitState>) -> Result<Json<TleRecord>, OrbitError> {
    state
        .store
        .tles
        .latest()
        .await?
        .map(Json)
        .ok_or(OrbitError::NotFound("element set"))
}
