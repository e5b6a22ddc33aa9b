//! Upstream log API client.
//!
//! Consumes `GET /profiles/{source_id}/logs?from=...&to=now&limit=...`
//! with an `X-Api-Key` header. Any non-200 response or transport error
//! is a per-source failure; the pipeline isolates it so other sources
//! keep ingesting.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::error::LensError;

/// Request timeout; a hung upstream call is a transient per-source
/// failure, not a stuck cycle.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Envelope of the upstream log listing response.
#[derive(Debug, Deserialize)]
struct LogsPage {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

/// Envelope of the upstream profile metadata response.
#[derive(Debug, Deserialize)]
struct ProfileEnvelope {
    #[serde(default)]
    data: ProfileData,
}

#[derive(Debug, Default, Deserialize)]
struct ProfileData {
    #[serde(default)]
    name: Option<String>,
}

/// Seam for the upstream log API.
#[async_trait]
pub trait UpstreamLogs: Send + Sync {
    /// Fetches one page of raw log events for a source.
    ///
    /// `from` is either an RFC 3339 timestamp (incremental window) or a
    /// relative token like `-1h` (bootstrap window).
    async fn fetch_logs(
        &self,
        api_key: &str,
        source_id: &str,
        from: &str,
        limit: i64,
    ) -> Result<Vec<serde_json::Value>, LensError>;

    /// Fetches the display name of a source, when the upstream knows it.
    async fn fetch_source_name(
        &self,
        api_key: &str,
        source_id: &str,
    ) -> Result<Option<String>, LensError>;
}

/// HTTP implementation over `reqwest`.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    /// Creates a client for the given API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Internal`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self, LensError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LensError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl UpstreamLogs for UpstreamClient {
    async fn fetch_logs(
        &self,
        api_key: &str,
        source_id: &str,
        from: &str,
        limit: i64,
    ) -> Result<Vec<serde_json::Value>, LensError> {
        let url = format!("{}/profiles/{}/logs", self.base_url, source_id);
        let response = self
            .http
            .get(&url)
            .header("X-Api-Key", api_key)
            .query(&[
                ("from", from),
                ("to", "now"),
                ("limit", &limit.to_string()),
                ("raw", "false"),
            ])
            .send()
            .await
            .map_err(|e| LensError::Upstream(format!("{source_id}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LensError::Upstream(format!(
                "{source_id}: upstream returned {status}"
            )));
        }

        let page: LogsPage = response
            .json()
            .await
            .map_err(|e| LensError::Upstream(format!("{source_id}: malformed payload: {e}")))?;
        Ok(page.data)
    }

    async fn fetch_source_name(
        &self,
        api_key: &str,
        source_id: &str,
    ) -> Result<Option<String>, LensError> {
        let url = format!("{}/profiles/{}", self.base_url, source_id);
        let response = self
            .http
            .get(&url)
            .header("X-Api-Key", api_key)
            .send()
            .await
            .map_err(|e| LensError::Upstream(format!("{source_id}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LensError::Upstream(format!(
                "{source_id}: upstream returned {status}"
            )));
        }

        let envelope: ProfileEnvelope = response
            .json()
            .await
            .map_err(|e| LensError::Upstream(format!("{source_id}: malformed payload: {e}")))?;
        Ok(envelope.data.name)
    }
}
