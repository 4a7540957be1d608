use serde::{Deserialize, Serialize};

/// Gap detection and filling parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GapFillingConfig {
    /// Gaps longer than this are bridged by propagation instead of interpolation.
    /// TOML: `gap_filling.orbital_threshold_hours`. Default: `24`.
    #[serde(default = "default_orbital_threshold_hours")]
    pub orbital_threshold_hours: f64,

    /// Spacing of synthetic samples inside a gap.
    /// TOML: `gap_filling.synthetic_step_seconds`. Default: `300`.
    #[serde(default = "default_synthetic_step_seconds")]
    pub synthetic_step_seconds: i64,

    /// Gaps longer than this are left unfilled.
    /// TOML: `gap_filling.max_gap_hours`. Default: `168` (one week).
    #[serde(default = "default_max_gap_hours")]
    pub max_gap_hours: f64,

    /// Nominal cadence of the live feed.
    /// TOML: `gap_filling.expected_interval_seconds`. Default: `5`.
    #[serde(default = "default_expected_interval_seconds")]
    pub expected_interval_seconds: i64,

    /// An interval counts as a gap once it exceeds
    /// `expected_interval_seconds * gap_tolerance_factor`.
    /// TOML: `gap_filling.gap_tolerance_factor`. Default: `3.0`.
    #[serde(default = "default_gap_tolerance_factor")]
    pub gap_tolerance_factor: f64,
}

impl Default for GapFillingConfig {
    fn default() -> Self {
        Self {
            orbital_threshold_hours: default_orbital_threshold_hours(),
            synthetic_step_seconds: default_synthetic_step_seconds(),
            max_gap_hours: default_max_gap_hours(),
            expected_interval_seconds: default_expected_interval_seconds(),
            gap_tolerance_factor: default_gap_tolerance_factor(),
        }
    }
}

fn default_orbital_threshold_hours() -> f64 {
    24.0
}

fn default_synthetic_step_seconds() -> i64 {
    300
}

fn default_max_gap_hours() -> f64 {
    168.0
}

fn default_expected_interval_seconds() -> i64 {
    5
}

fn default_gap_tolerance_factor() -> f64 {
    3.0
}
