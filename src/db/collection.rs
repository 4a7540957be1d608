//! Per-collection table knowledge.
//!
//! Each marker type (`Positions`, `Crew`, ...) binds a record type to its
//! table, its columns and its upsert/patch SQL. The generic actor in
//! `actor.rs` does the rest.

use orbitcache_schema::{BriefingRecord, CrewRecord, PositionRecord, TleRecord, TleSource};
use sqlx::{
    FromRow, Sqlite,
    query::Query,
    sqlite::{SqliteArguments, SqliteRow},
};
use std::fmt;

use super::models::{DbBriefing, DbCrew, DbPosition, DbTle};
use crate::error::OrbitError;

pub type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// A column that callers may filter or sort on.
pub trait ColumnName: Copy + Send + Sync + fmt::Debug + 'static {
    fn column(self) -> &'static str;
}

pub trait Collection: fmt::Debug + Send + Sync + 'static {
    type Record: Clone + Send + Sync + fmt::Debug + 'static;
    type Row: for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static;
    type Field: ColumnName;
    type Patch: Send + Sync + fmt::Debug + 'static;

    /// Used for log fields.
    const NAME: &'static str;
    const TABLE: &'static str;
    const COLUMNS: &'static str;
    /// Default sort column; also the age column for retention.
    const ORDER_KEY: &'static str;

    /// `INSERT INTO ... VALUES (...)` without a conflict clause.
    const INSERT_SQL: &'static str;
    /// Assignments for `ON CONFLICT(id) DO UPDATE SET`.
    const UPSERT_SET: &'static str;
    /// `UPDATE ... SET col = COALESCE(?, col) ... WHERE id = ?`; the key binds last.
    const PATCH_SQL: &'static str;
    /// Mutations adjust `storage_metadata.position_count`.
    const TRACKS_COUNT: bool = false;

    fn decode(row: Self::Row) -> Result<Self::Record, OrbitError>;

    fn bind_record<'q>(query: SqliteQuery<'q>, record: &'q Self::Record) -> SqliteQuery<'q>;

    fn bind_patch<'q>(query: SqliteQuery<'q>, patch: &'q Self::Patch) -> SqliteQuery<'q>;
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct Positions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionField {
    Id,
    Timestamp,
    Latitude,
    Longitude,
    Altitude,
    Velocity,
    Visibility,
    Origin,
}

impl ColumnName for PositionField {
    fn column(self) -> &'static str {
        match self {
            PositionField::Id => "id",
            PositionField::Timestamp => "timestamp_seconds",
            PositionField::Latitude => "latitude",
            PositionField::Longitude => "longitude",
            PositionField::Altitude => "altitude_km",
            PositionField::Velocity => "velocity_kmh",
            PositionField::Visibility => "visibility",
            PositionField::Origin => "origin",
        }
    }
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct PositionPatch {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_km: Option<f64>,
    pub velocity_kmh: Option<f64>,
    pub visibility: Option<String>,
}

impl Collection for Positions {
    type Record = PositionRecord;
    type Row = DbPosition;
    type Field = PositionField;
    type Patch = PositionPatch;

    const NAME: &'static str = "positions";
    const TABLE: &'static str = "positions";
    const COLUMNS: &'static str =
        "id, timestamp_seconds, latitude, longitude, altitude_km, velocity_kmh, visibility, origin";
    const ORDER_KEY: &'static str = "timestamp_seconds";
    const TRACKS_COUNT: bool = true;

    const INSERT_SQL: &'static str = r#"
        INSERT INTO positions (
            id, timestamp_seconds, latitude, longitude, altitude_km, velocity_kmh, visibility, origin
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
    "#;
    const UPSERT_SET: &'static str = r#"
        timestamp_seconds = excluded.timestamp_seconds,
        latitude = excluded.latitude,
        longitude = excluded.longitude,
        altitude_km = excluded.altitude_km,
        velocity_kmh = excluded.velocity_kmh,
        visibility = excluded.visibility,
        origin = excluded.origin
    "#;
    const PATCH_SQL: &'static str = r#"
        UPDATE positions
        SET
            latitude = COALESCE(?, latitude),
            longitude = COALESCE(?, longitude),
            altitude_km = COALESCE(?, altitude_km),
            velocity_kmh = COALESCE(?, velocity_kmh),
            visibility = COALESCE(?, visibility)
        WHERE id = ?
    "#;

    fn decode(row: Self::Row) -> Result<Self::Record, OrbitError> {
        PositionRecord::try_from(row)
    }

    fn bind_record<'q>(query: SqliteQuery<'q>, r: &'q Self::Record) -> SqliteQuery<'q> {
        query
            .bind(&r.id)
            .bind(r.timestamp_seconds)
            .bind(r.latitude)
            .bind(r.longitude)
            .bind(r.altitude_km)
            .bind(r.velocity_kmh)
            .bind(&r.visibility)
            .bind(r.origin.as_str())
    }

    fn bind_patch<'q>(query: SqliteQuery<'q>, p: &'q Self::Patch) -> SqliteQuery<'q> {
        query
            .bind(p.latitude)
            .bind(p.longitude)
            .bind(p.altitude_km)
            .bind(p.velocity_kmh)
            .bind(p.visibility.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Crew
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct Crew;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrewField {
    Id,
    Name,
    Craft,
    Agency,
    FetchedAt,
}

impl ColumnName for CrewField {
    fn column(self) -> &'static str {
        match self {
            CrewField::Id => "id",
            CrewField::Name => "name",
            CrewField::Craft => "craft",
            CrewField::Agency => "agency",
            CrewField::FetchedAt => "fetched_at",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CrewPatch {
    pub craft: Option<String>,
    pub image: Option<String>,
    pub role: Option<String>,
    pub agency: Option<String>,
    pub launch_date: Option<String>,
    pub end_date: Option<String>,
}

impl Collection for Crew {
    type Record = CrewRecord;
    type Row = DbCrew;
    type Field = CrewField;
    type Patch = CrewPatch;

    const NAME: &'static str = "crew";
    const TABLE: &'static str = "crew";
    const COLUMNS: &'static str =
        "id, name, craft, image, role, agency, launch_date, end_date, fetched_at";
    const ORDER_KEY: &'static str = "fetched_at";

    const INSERT_SQL: &'static str = r#"
        INSERT INTO crew (
            id, name, craft, image, role, agency, launch_date, end_date, fetched_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
    "#;
    const UPSERT_SET: &'static str = r#"
        name = excluded.name,
        craft = excluded.craft,
        image = excluded.image,
        role = excluded.role,
        agency = excluded.agency,
        launch_date = excluded.launch_date,
        end_date = excluded.end_date,
        fetched_at = excluded.fetched_at
    "#;
    const PATCH_SQL: &'static str = r#"
        UPDATE crew
        SET
            craft = COALESCE(?, craft),
            image = COALESCE(?, image),
            role = COALESCE(?, role),
            agency = COALESCE(?, agency),
            launch_date = COALESCE(?, launch_date),
            end_date = COALESCE(?, end_date)
        WHERE id = ?
    "#;

    fn decode(row: Self::Row) -> Result<Self::Record, OrbitError> {
        Ok(row.into())
    }

    fn bind_record<'q>(query: SqliteQuery<'q>, r: &'q Self::Record) -> SqliteQuery<'q> {
        query
            .bind(&r.id)
            .bind(&r.name)
            .bind(&r.craft)
            .bind(r.image.as_deref())
            .bind(r.role.as_deref())
            .bind(r.agency.as_deref())
            .bind(r.launch_date.as_deref())
            .bind(r.end_date.as_deref())
            .bind(r.fetched_at)
    }

    fn bind_patch<'q>(query: SqliteQuery<'q>, p: &'q Self::Patch) -> SqliteQuery<'q> {
        query
            .bind(p.craft.as_deref())
            .bind(p.image.as_deref())
            .bind(p.role.as_deref())
            .bind(p.agency.as_deref())
            .bind(p.launch_date.as_deref())
            .bind(p.end_date.as_deref())
    }
}

// ---------------------------------------------------------------------------
// TLE
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct Tles;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TleField {
    Id,
    FetchedAt,
    Source,
}

impl ColumnName for TleField {
    fn column(self) -> &'static str {
        match self {
            TleField::Id => "id",
            TleField::FetchedAt => "fetched_at",
            TleField::Source => "source",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TlePatch {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub source: Option<TleSource>,
}

impl Collection for Tles {
    type Record = TleRecord;
    type Row = DbTle;
    type Field = TleField;
    type Patch = TlePatch;

    const NAME: &'static str = "tle";
    const TABLE: &'static str = "tle";
    const COLUMNS: &'static str = "id, line1, line2, fetched_at, source";
    const ORDER_KEY: &'static str = "fetched_at";

    const INSERT_SQL: &'static str = r#"
        INSERT INTO tle (id, line1, line2, fetched_at, source)
        VALUES (?, ?, ?, ?, ?)
    "#;
    const UPSERT_SET: &'static str = r#"
        line1 = excluded.line1,
        line2 = excluded.line2,
        fetched_at = excluded.fetched_at,
        source = excluded.source
    "#;
    const PATCH_SQL: &'static str = r#"
        UPDATE tle
        SET
            line1 = COALESCE(?, line1),
            line2 = COALESCE(?, line2),
            source = COALESCE(?, source)
        WHERE id = ?
    "#;

    fn decode(row: Self::Row) -> Result<Self::Record, OrbitError> {
        TleRecord::try_from(row)
    }

    fn bind_record<'q>(query: SqliteQuery<'q>, r: &'q Self::Record) -> SqliteQuery<'q> {
        query
            .bind(&r.id)
            .bind(&r.line1)
            .bind(&r.line2)
            .bind(r.fetched_at)
            .bind(r.source.as_str())
    }

    fn bind_patch<'q>(query: SqliteQuery<'q>, p: &'q Self::Patch) -> SqliteQuery<'q> {
        query
            .bind(p.line1.as_deref())
            .bind(p.line2.as_deref())
            .bind(p.source.map(|s| s.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Briefings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct Briefings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BriefingField {
    Id,
    GeneratedAt,
}

impl ColumnName for BriefingField {
    fn column(self) -> &'static str {
        match self {
            BriefingField::Id => "id",
            BriefingField::GeneratedAt => "generated_at",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BriefingPatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl Collection for Briefings {
    type Record = BriefingRecord;
    type Row = DbBriefing;
    type Field = BriefingField;
    type Patch = BriefingPatch;

    const NAME: &'static str = "briefings";
    const TABLE: &'static str = "briefings";
    const COLUMNS: &'static str = "id, generated_at, title, content";
    const ORDER_KEY: &'static str = "generated_at";

    const INSERT_SQL: &'static str = r#"
        INSERT INTO briefings (id, generated_at, title, content)
        VALUES (?, ?, ?, ?)
    "#;
    const UPSERT_SET: &'static str = r#"
        generated_at = excluded.generated_at,
        title = excluded.title,
        content = excluded.content
    "#;
    const PATCH_SQL: &'static str = r#"
        UPDATE briefings
        SET
            title = COALESCE(?, title),
            content = COALESCE(?, content)
        WHERE id = ?
    "#;

    fn decode(row: Self::Row) -> Result<Self::Record, OrbitError> {
        Ok(row.into())
    }

    fn bind_record<'q>(query: SqliteQuery<'q>, r: &'q Self::Record) -> SqliteQuery<'q> {
        query
            .bind(&r.id)
            .bind(r.generated_at)
            .bind(r.title.as_deref())
            .bind(&r.content)
    }

    fn bind_patch<'q>(query: SqliteQuery<'q>, p: &'q Self::Patch) -> SqliteQuery<'q> {
        query.bind(p.title.as_deref()).bind(p.content.as_deref())
    }
}
