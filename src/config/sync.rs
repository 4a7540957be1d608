use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Background sync cadence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// TOML: `sync.position_interval_ms`. Default: `5000`.
    #[serde(default = "default_position_interval_ms")]
    pub position_interval_ms: u64,

    /// TOML: `sync.crew_interval_ms`. Default: `3600000` (one hour).
    #[serde(default = "default_hourly_ms")]
    pub crew_interval_ms: u64,

    /// TOML: `sync.tle_interval_ms`. Default: `3600000` (one hour).
    #[serde(default = "default_hourly_ms")]
    pub tle_interval_ms: u64,

    /// Fire one fetch per data type as soon as the manager starts.
    /// TOML: `sync.fetch_on_start`. Default: `true`.
    #[serde(default = "default_fetch_on_start")]
    pub fetch_on_start: bool,

    /// Number of most recent positions scanned for open gaps after each position tick.
    /// TOML: `sync.gap_scan_window`. Default: `720` (one hour at 5s cadence).
    #[serde(default = "default_gap_scan_window")]
    pub gap_scan_window: u32,
}

impl SyncConfig {
    pub fn position_interval(&self) -> Duration {
        Duration::from_millis(self.position_interval_ms.max(1))
    }

    pub fn crew_interval(&self) -> Duration {
        Duration::from_millis(self.crew_interval_ms.max(1))
    }

    pub fn tle_interval(&self) -> Duration {
        Duration::from_millis(self.tle_interval_ms.max(1))
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            position_interval_ms: default_position_interval_ms(),
            crew_interval_ms: default_hourly_ms(),
            tle_interval_ms: default_hourly_ms(),
            fetch_on_start: default_fetch_on_start(),
            gap_scan_window: default_gap_scan_window(),
        }
    }
}

fn default_position_interval_ms() -> u64 {
    5_000
}

fn default_hourly_ms() -> u64 {
    3_600_000
}

fn default_fetch_on_start() -> bool {
    true
}

fn default_gap_scan_window() -> u32 {
    720
}
