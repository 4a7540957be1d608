use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Visibility tag written on every synthetic position sample.
pub const SYNTHETIC_VISIBILITY: &str = "synthetic";

/// How a position sample came into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionOrigin {
    /// Fetched from the live feed.
    Observed,
    /// Linear bridge between two observed samples.
    Interpolated,
    /// Computed from an orbital element set.
    Propagated,
}

impl PositionOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionOrigin::Observed => "observed",
            PositionOrigin::Interpolated => "interpolated",
            PositionOrigin::Propagated => "propagated",
        }
    }

    pub fn is_synthetic(&self) -> bool {
        !matches!(self, PositionOrigin::Observed)
    }
}

impl fmt::Display for PositionOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "observed" => Ok(PositionOrigin::Observed),
            "interpolated" => Ok(PositionOrigin::Interpolated),
            "propagated" => Ok(PositionOrigin::Propagated),
            other => Err(format!("unknown position origin: {other}")),
        }
    }
}

/// One sample of the position feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRecord {
    /// Derived from `timestamp_seconds`; see [`PositionRecord::id_for`].
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp_seconds: i64,
    pub altitude_km: f64,
    pub velocity_kmh: f64,
    pub visibility: String,
    pub origin: PositionOrigin,
}

impl PositionRecord {
    pub fn id_for(timestamp_seconds: i64) -> String {
        format!("pos-{timestamp_seconds}")
    }

    pub fn observed(
        timestamp_seconds: i64,
        latitude: f64,
        longitude: f64,
        altitude_km: f64,
        velocity_kmh: f64,
        visibility: impl Into<String>,
    ) -> Self {
        Self {
            id: Self::id_for(timestamp_seconds),
            latitude,
            longitude,
            timestamp_seconds,
            altitude_km,
            velocity_kmh,
            visibility: visibility.into(),
            origin: PositionOrigin::Observed,
        }
    }

    /// Filler sample. Always carries [`SYNTHETIC_VISIBILITY`] so consumers that
    /// only look at `visibility` can still tell it apart from live data.
    pub fn synthetic(
        timestamp_seconds: i64,
        latitude: f64,
        longitude: f64,
        altitude_km: f64,
        velocity_kmh: f64,
        origin: PositionOrigin,
    ) -> Self {
        Self {
            id: Self::id_for(timestamp_seconds),
            latitude,
            longitude,
            timestamp_seconds,
            altitude_km,
            velocity_kmh,
            visibility: SYNTHETIC_VISIBILITY.to_string(),
            origin,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.origin.is_synthetic()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrewRecord {
    pub id: String,
    pub name: String,
    pub craft: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Unix seconds of the sync tick that produced this manifest.
    pub fetched_at: i64,
}

impl CrewRecord {
    /// Lowercase ASCII slug, e.g. `"Oleg Kononenko"` -> `"oleg-kononenko"`.
    pub fn slug(name: &str) -> String {
        let mut slug = String::with_capacity(name.len());
        let mut pending_dash = false;
        for ch in name.chars() {
            if ch.is_ascii_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(ch.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
        slug
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TleSource {
    Primary,
    Secondary,
    Fallback,
}

impl TleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TleSource::Primary => "primary",
            TleSource::Secondary => "secondary",
            TleSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for TleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TleSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(TleSource::Primary),
            "secondary" => Ok(TleSource::Secondary),
            "fallback" => Ok(TleSource::Fallback),
            other => Err(format!("unknown tle source: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TleRecord {
    pub id: String,
    pub line1: String,
    pub line2: String,
    /// Unix seconds.
    pub fetched_at: i64,
    pub source: TleSource,
}

impl TleRecord {
    pub fn id_for(fetched_at: i64) -> String {
        format!("tle-{fetched_at}")
    }

    pub fn new(line1: String, line2: String, fetched_at: i64, source: TleSource) -> Self {
        Self {
            id: Self::id_for(fetched_at),
            line1,
            line2,
            fetched_at,
            source,
        }
    }
}

/// Narrative text produced outside this crate; stored and migrated only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefingRecord {
    pub id: String,
    /// Unix seconds.
    pub generated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_collapses_separators() {
        assert_eq!(CrewRecord::slug("Oleg Kononenko"), "oleg-kononenko");
        assert_eq!(CrewRecord::slug("  Sunita  L. Williams "), "sunita-l-williams");
        assert_eq!(CrewRecord::slug("---"), "");
    }

    #[test]
    fn synthetic_positions_are_tagged() {
        let rec = PositionRecord::synthetic(100, 1.0, 2.0, 410.0, 27_600.0, PositionOrigin::Propagated);
        assert_eq!(rec.id, "pos-100");
        assert_eq!(rec.visibility, SYNTHETIC_VISIBILITY);
        assert!(rec.is_synthetic());

        let live = PositionRecord::observed(100, 1.0, 2.0, 410.0, 27_600.0, "daylight");
        assert!(!live.is_synthetic());
    }

    #[test]
    fn enums_round_trip_through_strings() {
        for origin in [
            PositionOrigin::Observed,
            PositionOrigin::Interpolated,
            PositionOrigin::Propagated,
        ] {
            assert_eq!(origin.as_str().parse::<PositionOrigin>().unwrap(), origin);
        }
        assert!("cached".parse::<TleSource>().is_err());
    }
}
