use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Basic (core) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// HTTP server listen address (e.g., "0.0.0.0", "127.0.0.1").
    /// TOML: `basic.listen_addr`. Default: `127.0.0.1`.
    #[serde(default = "default_listen_ip")]
    pub listen_addr: IpAddr,

    /// HTTP server listen port.
    /// TOML: `basic.listen_port`. Default: `8190`.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Database URL for SQLite.
    /// TOML: `basic.database_url`. Default: `sqlite://orbitcache.db`.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Log level for tracing subscriber initialization (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `basic.loglevel`. Default: `info`.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    /// Legacy JSON snapshot imported once at startup. Missing file means nothing to import.
    /// TOML: `basic.legacy_snapshot_path`. Default: `legacy-snapshot.json`.
    #[serde(default = "default_legacy_snapshot_path")]
    pub legacy_snapshot_path: PathBuf,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_ip(),
            listen_port: default_listen_port(),
            database_url: default_database_url(),
            loglevel: default_loglevel(),
            legacy_snapshot_path: default_legacy_snapshot_path(),
        }
    }
}

fn default_listen_ip() -> IpAddr {
    Ipv4Addr::LOCALHOST.into()
}

fn default_listen_port() -> u16 {
    8190
}

fn default_database_url() -> String {
    "sqlite://orbitcache.db".to_string()
}

fn default_loglevel() -> String {
    "info".to_string()
}

fn default_legacy_snapshot_path() -> PathBuf {
    PathBuf::from("legacy-snapshot.json")
}
