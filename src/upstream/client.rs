use super::retry::{get_with_retry, retry_policy};
use super::{RawTle, TelemetrySource};
use crate::config::UpstreamConfig;
use crate::error::OrbitError;
use crate::utils::logging::with_pretty_json_debug;
use async_trait::async_trait;
use backon::ExponentialBuilder;
use orbitcache_schema::{TleLines, TleSource, validate_tle, validate_tle_lines};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!("orbitcache/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed [`TelemetrySource`].
pub struct HttpTelemetrySource {
    client: reqwest::Client,
    retry_policy: ExponentialBuilder,
    position_url: Url,
    crew_url: Url,
    tle_primary_url: Url,
    tle_secondary_url: Url,
    fallback: (String, String),
}

impl HttpTelemetrySource {
    pub fn new(cfg: &UpstreamConfig) -> Result<Self, OrbitError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(cfg.request_timeout_secs.max(1)));

        if let Some(proxy_url) = cfg.proxy.as_ref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }

        Ok(Self {
            client: builder.build()?,
            retry_policy: retry_policy(cfg.retry_max_times),
            position_url: cfg.position_url.clone(),
            crew_url: cfg.crew_url.clone(),
            tle_primary_url: cfg.tle_primary_url.clone(),
            tle_secondary_url: cfg.tle_secondary_url.clone(),
            fallback: (cfg.fallback_tle_line1.clone(), cfg.fallback_tle_line2.clone()),
        })
    }

    async fn get_json(&self, source: &'static str, url: &Url) -> Result<Value, OrbitError> {
        let resp = get_with_retry(source, &self.client, url, self.retry_policy).await?;
        let bytes = resp.bytes().await?;
        let value: Value = serde_json::from_slice(&bytes)?;
        with_pretty_json_debug(&value, |json| {
            debug!(source, "[{source}] upstream payload:\n{json}");
        });
        Ok(value)
    }

    async fn primary_tle(&self) -> Result<String, OrbitError> {
        let resp =
            get_with_retry("tle", &self.client, &self.tle_primary_url, self.retry_policy).await?;
        let text = resp.text().await?;
        // Only a shape check; the tick validates again with the real fetch time.
        validate_tle(&text, TleSource::Primary, 0)?;
        Ok(text)
    }

    async fn secondary_tle(&self) -> Result<String, OrbitError> {
        let value = self.get_json("tle", &self.tle_secondary_url).await?;
        let lines: TleLines = serde_json::from_value(value)?;
        validate_tle_lines(&lines.line1, &lines.line2, TleSource::Secondary, 0)?;
        Ok(format!("{}\n{}", lines.line1, lines.line2))
    }
}

#[async_trait]
impl TelemetrySource for HttpTelemetrySource {
    async fn fetch_position(&self) -> Result<Value, OrbitError> {
        self.get_json("position", &self.position_url).await
    }

    async fn fetch_crew(&self) -> Result<Value, OrbitError> {
        self.get_json("crew", &self.crew_url).await
    }

    /// Primary, then secondary, then the configured fallback set.
    async fn fetch_tle(&self) -> Result<RawTle, OrbitError> {
        match self.primary_tle().await {
            Ok(text) => {
                return Ok(RawTle {
                    text,
                    source: TleSource::Primary,
                });
            }
            Err(e) => warn!(error = %e, "primary TLE source failed; trying secondary"),
        }

        match self.secondary_tle().await {
            Ok(text) => {
                return Ok(RawTle {
                    text,
                    source: TleSource::Secondary,
                });
            }
            Err(e) => warn!(error = %e, "secondary TLE source failed; using fallback set"),
        }

        let (line1, line2) = &self.fallback;
        Ok(RawTle {
            text: format!("{line1}\n{line2}"),
            source: TleSource::Fallback,
        })
    }
}
