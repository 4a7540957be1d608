//! Explicit record validators.
//!
//! Every validator returns `Result<_, ValidationError>`; a malformed payload is
//! ordinary control flow for the caller, never a panic.

use crate::records::{CrewRecord, PositionRecord, TleRecord, TleSource};
use crate::upstream::{CrewManifest, PositionPayload};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error as ThisError;

const TLE_LINE_LEN: usize = 69;

#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum ValidationError {
    #[error("malformed {entity} payload: {message}")]
    Malformed {
        entity: &'static str,
        message: String,
    },

    #[error("{entity}.{field} out of range: {value}")]
    OutOfRange {
        entity: &'static str,
        field: &'static str,
        value: f64,
    },

    #[error("{entity}.{field} is missing or empty")]
    Missing {
        entity: &'static str,
        field: &'static str,
    },

    #[error("tle line {line} invalid: {reason}")]
    TleLine { line: u8, reason: String },
}

impl ValidationError {
    fn malformed(entity: &'static str, err: impl std::fmt::Display) -> Self {
        ValidationError::Malformed {
            entity,
            message: err.to_string(),
        }
    }
}

fn check_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            entity: "position",
            field,
            value,
        })
    }
}

/// Validate a raw position object into an observed [`PositionRecord`].
pub fn validate_position(payload: &Value) -> Result<PositionRecord, ValidationError> {
    let parsed: PositionPayload = serde_json::from_value(payload.clone())
        .map_err(|e| ValidationError::malformed("position", e))?;
    validate_position_payload(parsed)
}

pub fn validate_position_payload(
    payload: PositionPayload,
) -> Result<PositionRecord, ValidationError> {
    check_range("latitude", payload.latitude, -90.0, 90.0)?;
    check_range("longitude", payload.longitude, -180.0, 180.0)?;
    check_range("altitude", payload.altitude, 0.0, f64::MAX)?;
    check_range("velocity", payload.velocity, 0.0, f64::MAX)?;
    if payload.timestamp <= 0 {
        return Err(ValidationError::OutOfRange {
            entity: "position",
            field: "timestamp",
            value: payload.timestamp as f64,
        });
    }

    let visibility = payload
        .visibility
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    Ok(PositionRecord::observed(
        payload.timestamp,
        payload.latitude,
        payload.longitude,
        payload.altitude,
        payload.velocity,
        visibility,
    ))
}

/// Validate a crew manifest into the full replacement set.
///
/// An empty `people` list is rejected: crew ticks replace the whole
/// collection, and an empty upstream answer must not wipe the cached roster.
pub fn validate_crew(payload: &Value, fetched_at: i64) -> Result<Vec<CrewRecord>, ValidationError> {
    let manifest: CrewManifest = serde_json::from_value(payload.clone())
        .map_err(|e| ValidationError::malformed("crew", e))?;

    if let Some(message) = manifest
        .message
        .as_deref()
        .filter(|m| !m.eq_ignore_ascii_case("success"))
    {
        return Err(ValidationError::Malformed {
            entity: "crew",
            message: format!("upstream reported `{message}`"),
        });
    }
    if manifest.people.is_empty() {
        return Err(ValidationError::Missing {
            entity: "crew",
            field: "people",
        });
    }

    let mut seen = HashSet::with_capacity(manifest.people.len());
    let mut records = Vec::with_capacity(manifest.people.len());
    for member in manifest.people {
        let name = member.name.trim().to_string();
        let craft = member.craft.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::Missing {
                entity: "crew",
                field: "name",
            });
        }
        if craft.is_empty() {
            return Err(ValidationError::Missing {
                entity: "crew",
                field: "craft",
            });
        }
        let id = CrewRecord::slug(&name);
        if id.is_empty() {
            return Err(ValidationError::Malformed {
                entity: "crew",
                message: format!("name `{name}` yields an empty slug"),
            });
        }
        if !seen.insert(id.clone()) {
            continue;
        }
        records.push(CrewRecord {
            id,
            name,
            craft,
            image: non_empty(member.image),
            role: non_empty(member.role),
            agency: non_empty(member.agency),
            launch_date: non_empty(member.launch_date),
            end_date: non_empty(member.end_date),
            fetched_at,
        });
    }
    Ok(records)
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Validate a plain-text element set: an optional name line followed by the
/// two element lines.
pub fn validate_tle(
    text: &str,
    source: TleSource,
    fetched_at: i64,
) -> Result<TleRecord, ValidationError> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect();

    let first = lines
        .iter()
        .position(|l| l.starts_with("1 "))
        .ok_or_else(|| ValidationError::TleLine {
            line: 1,
            reason: "no line starting with `1 `".to_string(),
        })?;
    let line2 = lines.get(first + 1).ok_or_else(|| ValidationError::TleLine {
        line: 2,
        reason: "missing second element line".to_string(),
    })?;

    validate_tle_lines(lines[first], line2, source, fetched_at)
}

pub fn validate_tle_lines(
    line1: &str,
    line2: &str,
    source: TleSource,
    fetched_at: i64,
) -> Result<TleRecord, ValidationError> {
    let line1 = line1.trim();
    let line2 = line2.trim();
    check_tle_line(line1, 1)?;
    check_tle_line(line2, 2)?;

    if line1[2..7] != line2[2..7] {
        return Err(ValidationError::TleLine {
            line: 2,
            reason: format!(
                "catalog number mismatch ({} vs {})",
                &line1[2..7],
                &line2[2..7]
            ),
        });
    }

    Ok(TleRecord::new(
        line1.to_string(),
        line2.to_string(),
        fetched_at,
        source,
    ))
}

fn check_tle_line(line: &str, number: u8) -> Result<(), ValidationError> {
    let invalid = |reason: String| ValidationError::TleLine {
        line: number,
        reason,
    };

    if !line.is_ascii() {
        return Err(invalid("non-ascii characters".to_string()));
    }
    if line.len() != TLE_LINE_LEN {
        return Err(invalid(format!(
            "expected {TLE_LINE_LEN} columns, got {}",
            line.len()
        )));
    }
    let bytes = line.as_bytes();
    if bytes[0] != b'0' + number || bytes[1] != b' ' {
        return Err(invalid(format!("must start with `{number} `")));
    }

    let expected = tle_checksum(&line[..TLE_LINE_LEN - 1]);
    let actual = bytes[TLE_LINE_LEN - 1];
    if !actual.is_ascii_digit() || actual - b'0' != expected {
        return Err(invalid(format!(
            "checksum mismatch (expected {expected}, found `{}`)",
            actual as char
        )));
    }
    Ok(())
}

/// Modulo-10 checksum: digits count their value, `-` counts one.
fn tle_checksum(body: &str) -> u8 {
    let sum: u32 = body
        .bytes()
        .map(|b| match b {
            b'0'..=b'9' => u32::from(b - b'0'),
            b'-' => 1,
            _ => 0,
        })
        .sum();
    (sum % 10) as u8
}
