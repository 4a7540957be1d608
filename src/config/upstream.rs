use serde::{Deserialize, Serialize};
use url::Url;

/// Element set used when both TLE upstreams fail.
///
/// Sourced from `ORBITCACHE_FALLBACK_TLE_LINE1`/`_LINE2` at build time when set.
pub const FALLBACK_TLE_LINE1: &str = match option_env!("ORBITCACHE_FALLBACK_TLE_LINE1") {
    Some(line) => line,
    None => "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927",
};
pub const FALLBACK_TLE_LINE2: &str = match option_env!("ORBITCACHE_FALLBACK_TLE_LINE2") {
    Some(line) => line,
    None => "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537",
};

/// Remote telemetry endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// JSON position feed.
    /// TOML: `upstream.position_url`.
    #[serde(default = "default_position_url")]
    pub position_url: Url,

    /// JSON crew manifest.
    /// TOML: `upstream.crew_url`.
    #[serde(default = "default_crew_url")]
    pub crew_url: Url,

    /// Plain-text element set (optional name line plus two lines).
    /// TOML: `upstream.tle_primary_url`.
    #[serde(default = "default_tle_primary_url")]
    pub tle_primary_url: Url,

    /// JSON element set `{line1, line2}`, tried when the primary fails.
    /// TOML: `upstream.tle_secondary_url`.
    #[serde(default = "default_tle_secondary_url")]
    pub tle_secondary_url: Url,

    /// Optional upstream HTTP proxy. If set, used for reqwest clients.
    /// TOML: `upstream.proxy`. Example: `http://127.0.0.1:1080`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Max retry attempts for transient upstream failures.
    /// TOML: `upstream.retry_max_times`. Default: `2`.
    #[serde(default = "default_retry_max_times")]
    pub retry_max_times: usize,

    /// Whole-request timeout.
    /// TOML: `upstream.request_timeout_secs`. Default: `10`.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// TOML: `upstream.fallback_tle_line1`.
    #[serde(default = "default_fallback_tle_line1")]
    pub fallback_tle_line1: String,

    /// TOML: `upstream.fallback_tle_line2`.
    #[serde(default = "default_fallback_tle_line2")]
    pub fallback_tle_line2: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            position_url: default_position_url(),
            crew_url: default_crew_url(),
            tle_primary_url: default_tle_primary_url(),
            tle_secondary_url: default_tle_secondary_url(),
            proxy: None,
            retry_max_times: default_retry_max_times(),
            request_timeout_secs: default_request_timeout_secs(),
            fallback_tle_line1: default_fallback_tle_line1(),
            fallback_tle_line2: default_fallback_tle_line2(),
        }
    }
}

fn parse_static(raw: &'static str) -> Url {
    Url::parse(raw).expect("invalid built-in upstream url")
}

fn default_position_url() -> Url {
    parse_static("https://api.wheretheiss.at/v1/satellites/25544")
}

fn default_crew_url() -> Url {
    parse_static("http://api.open-notify.org/astros.json")
}

fn default_tle_primary_url() -> Url {
    parse_static("https://celestrak.org/NORAD/elements/gp.php?CATNR=25544&FORMAT=TLE")
}

fn default_tle_secondary_url() -> Url {
    parse_static("https://tle.ivanstanojevic.me/api/tle/25544")
}

fn default_retry_max_times() -> usize {
    2
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_fallback_tle_line1() -> String {
    FALLBACK_TLE_LINE1.to_string()
}

fn default_fallback_tle_line2() -> String {
    FALLBACK_TLE_LINE2.to_string()
}
