use crate::error::{IsRetryable, OrbitError};
use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;
use url::Url;

use super::UPSTREAM_BODY_PREVIEW_CHARS;

pub(crate) fn retry_policy(max_times: usize) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_millis(300))
        .with_max_times(max_times)
        .with_jitter()
}

/// `GET url`, retrying transient failures. Non-2xx answers become
/// [`OrbitError::UpstreamStatus`].
pub(crate) async fn get_with_retry(
    source: &'static str,
    client: &reqwest::Client,
    url: &Url,
    policy: ExponentialBuilder,
) -> Result<reqwest::Response, OrbitError> {
    (|| {
        let client = client.clone();
        let url = url.clone();

        async move {
            let resp = client.get(url.clone()).send().await?;
            let status = resp.status();
            if status.is_success() {
                return Ok(resp);
            }

            let body_preview = match resp.bytes().await {
                Ok(bytes) => {
                    let raw_body = String::from_utf8_lossy(&bytes);
                    format!("{:.len$}", raw_body, len = UPSTREAM_BODY_PREVIEW_CHARS)
                }
                Err(e) => format!("<failed to read body: {e}>"),
            };
            tracing::debug!(
                source,
                %status,
                url = %url,
                body = %body_preview,
                "[{source}] Upstream answered with an error status"
            );
            Err(OrbitError::UpstreamStatus(status))
        }
    })
    .retry(policy)
    .when(|e: &OrbitError| e.is_retryable())
    .notify(|err, dur: Duration| {
        tracing::warn!(source, "[{source}] retrying after error {} in {:?}", err, dur);
    })
    .await
}
