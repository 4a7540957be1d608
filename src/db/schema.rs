//! SQL DDL for initializing the database schema.

/// Version written by a completed migration.
pub const CURRENT_SCHEMA_VERSION: i64 = 2;

/// SQLite schema includes:
/// - one table per collection (`positions`, `crew`, `tle`, `briefings`)
/// - `storage_metadata`, a singleton row pinned to `id = 1`
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Position samples (observed and synthetic)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS positions (
    id TEXT PRIMARY KEY NOT NULL,
    timestamp_seconds INTEGER NOT NULL UNIQUE,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    altitude_km REAL NOT NULL,
    velocity_kmh REAL NOT NULL,
    visibility TEXT NOT NULL,
    origin TEXT NOT NULL DEFAULT 'observed'
        CHECK (origin IN ('observed', 'interpolated', 'propagated'))
);

-- ---------------------------------------------------------------------------
-- Crew roster (whole-set replace per sync tick)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS crew (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    craft TEXT NOT NULL,
    image TEXT NULL,
    role TEXT NULL,
    agency TEXT NULL,
    launch_date TEXT NULL,
    end_date TEXT NULL,
    fetched_at INTEGER NOT NULL -- unix seconds
);

CREATE INDEX IF NOT EXISTS idx_crew_fetched_at ON crew(fetched_at);

-- ---------------------------------------------------------------------------
-- Two-line element sets
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS tle (
    id TEXT PRIMARY KEY NOT NULL,
    line1 TEXT NOT NULL,
    line2 TEXT NOT NULL,
    fetched_at INTEGER NOT NULL, -- unix seconds
    source TEXT NOT NULL CHECK (source IN ('primary', 'secondary', 'fallback'))
);

CREATE INDEX IF NOT EXISTS idx_tle_fetched_at ON tle(fetched_at);

-- ---------------------------------------------------------------------------
-- Generated briefings
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS briefings (
    id TEXT PRIMARY KEY NOT NULL,
    generated_at INTEGER NOT NULL, -- unix seconds
    title TEXT NULL,
    content TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_briefings_generated_at ON briefings(generated_at);

-- ---------------------------------------------------------------------------
-- Storage metadata (singleton)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS storage_metadata (
    id INTEGER PRIMARY KEY NOT NULL CHECK (id = 1),
    initialized INTEGER NOT NULL DEFAULT 0,
    last_fetch_at TEXT NULL, -- RFC3339
    last_cleanup_at TEXT NULL, -- RFC3339
    schema_version INTEGER NOT NULL DEFAULT 1,
    position_count INTEGER NULL,
    migration_completed_at TEXT NULL -- RFC3339
);

INSERT OR IGNORE INTO storage_metadata (id, initialized, schema_version, position_count)
VALUES (1, 1, 1, 0);
"#;
