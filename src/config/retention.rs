use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Age and count bounds for the local cache.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Positions older than this are evicted.
    /// TOML: `retention.max_age_days`. Default: `30`.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,

    /// Position count cap.
    /// TOML: `retention.max_records`. Default: `600000`.
    #[serde(default = "default_max_records")]
    pub max_records: u64,

    /// Rows deleted per statement; each batch goes through the collection mailbox.
    /// TOML: `retention.cleanup_batch_size`. Default: `10000`.
    #[serde(default = "default_cleanup_batch_size")]
    pub cleanup_batch_size: u32,

    /// TOML: `retention.cleanup_interval_ms`. Default: `60000`.
    #[serde(default = "default_cleanup_interval_ms")]
    pub cleanup_interval_ms: u64,

    /// TOML: `retention.tle_max_records`. Default: `100`.
    #[serde(default = "default_small_cap")]
    pub tle_max_records: u64,

    /// TOML: `retention.crew_max_records`. Default: `100`.
    #[serde(default = "default_small_cap")]
    pub crew_max_records: u64,

    /// TOML: `retention.briefing_max_records`. Default: `500`.
    #[serde(default = "default_briefing_max_records")]
    pub briefing_max_records: u64,
}

impl RetentionConfig {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms.max(1))
    }

    pub fn max_age_seconds(&self) -> i64 {
        i64::from(self.max_age_days) * 86_400
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
            max_records: default_max_records(),
            cleanup_batch_size: default_cleanup_batch_size(),
            cleanup_interval_ms: default_cleanup_interval_ms(),
            tle_max_records: default_small_cap(),
            crew_max_records: default_small_cap(),
            briefing_max_records: default_briefing_max_records(),
        }
    }
}

fn default_max_age_days() -> u32 {
    30
}

fn default_max_records() -> u64 {
    600_000
}

fn default_cleanup_batch_size() -> u32 {
    10_000
}

fn default_cleanup_interval_ms() -> u64 {
    60_000
}

fn default_small_cap() -> u64 {
    100
}

fn default_briefing_max_records() -> u64 {
    500
}
