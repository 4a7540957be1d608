mod basic;
mod retention;
mod sync;
mod upstream;

pub use basic::BasicConfig;
pub use orbitcache_gaps::GapFillingConfig;
pub use retention::RetentionConfig;
pub use sync::SyncConfig;
pub use upstream::{FALLBACK_TLE_LINE1, FALLBACK_TLE_LINE2, UpstreamConfig};

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::LazyLock};

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Fetch cadence (see `sync` table in config.toml).
    #[serde(default)]
    pub sync: SyncConfig,

    /// Eviction policy (see `retention` table in config.toml).
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Gap detection and filling (see `gap_filling` table in config.toml).
    #[serde(default)]
    pub gap_filling: GapFillingConfig,

    /// Remote endpoints (see `upstream` table in config.toml).
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Builds a Figment that merges defaults and a config TOML file.
    pub fn figment() -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
        } else {
            figment
        }
    }

    /// Loads configuration by merging defaults and `config.toml` if present.
    pub fn from_optional_toml() -> Self {
        Self::figment().extract().unwrap_or_else(|err| {
            panic!("failed to extract configuration (defaults + optional config.toml): {err}")
        })
    }
}

/// Global, lazily-initialized configuration instance.
pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::from_optional_toml);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_overrides_merge_over_defaults() {
        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                [retention]
                max_records = 10

                [gap_filling]
                synthetic_step_seconds = 60
                "#,
            ))
            .extract()
            .expect("config extracts");

        assert_eq!(cfg.retention.max_records, 10);
        assert_eq!(cfg.retention.max_age_days, 30);
        assert_eq!(cfg.gap_filling.synthetic_step_seconds, 60);
        assert_eq!(cfg.gap_filling.orbital_threshold_hours, 24.0);
        assert_eq!(cfg.sync.gap_scan_window, 720);
    }

    #[test]
    fn unknown_retention_key_is_rejected() {
        let res: Result<Config, _> = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string("[retention]\nmax_recrods = 1\n"))
            .extract();
        assert!(res.is_err());
    }
}
