//! Remote telemetry collaborators.

mod client;
mod retry;

pub use client::HttpTelemetrySource;

use crate::error::OrbitError;
use async_trait::async_trait;
use orbitcache_schema::TleSource;
use serde_json::Value;

/// Cap on upstream body text copied into logs.
pub(crate) const UPSTREAM_BODY_PREVIEW_CHARS: usize = 512;

/// An element set as fetched, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTle {
    pub text: String,
    pub source: TleSource,
}

/// Fetches raw payloads; validation happens in the sync tick.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn fetch_position(&self) -> Result<Value, OrbitError>;

    async fn fetch_crew(&self) -> Result<Value, OrbitError>;

    async fn fetch_tle(&self) -> Result<RawTle, OrbitError>;
}
