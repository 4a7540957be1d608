//! Wire shapes of the remote feeds, before validation.

use serde::{Deserialize, Serialize};

/// Live position sample (wheretheiss.at-style object).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionPayload {
    pub latitude: f64,
    pub longitude: f64,
    /// Kilometres.
    pub altitude: f64,
    /// Kilometres per hour.
    pub velocity: f64,
    #[serde(default)]
    pub visibility: Option<String>,
    /// Unix seconds.
    pub timestamp: i64,
}

/// People-in-space manifest (open-notify-style object).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewManifest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub number: Option<usize>,
    pub people: Vec<CrewMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrewMember {
    pub name: String,
    pub craft: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub agency: Option<String>,
    #[serde(default, alias = "launch")]
    pub launch_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// JSON element-set body served by the secondary TLE endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TleLines {
    pub line1: String,
    pub line2: String,
}
