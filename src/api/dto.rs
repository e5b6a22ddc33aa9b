//! Query-parameter and response DTOs shared across endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::LogRecord;
use crate::error::LensError;
use crate::ingest::CycleSummary;

/// Maximum page size for the log listing.
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Splits a comma-separated query value into trimmed, non-empty items.
#[must_use]
pub fn split_csv(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Parses the `range` query value, defaulting to `24h`.
///
/// # Errors
///
/// Returns [`LensError::InvalidRange`] for an unknown token.
pub fn parse_range(value: Option<&str>) -> Result<crate::domain::RangeToken, LensError> {
    let raw = value.unwrap_or("24h");
    raw.parse()
        .map_err(|_| LensError::InvalidRange(raw.to_string()))
}

/// Shared analytics query parameters.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct StatsParams {
    /// Restrict to one source ID.
    pub source: Option<String>,
    /// Time-range token (`30m`, `1h`, `6h`, `24h`, `7d`, `30d`, `3m`, `all`).
    /// Defaults to `24h`.
    pub range: Option<String>,
    /// Comma-separated domain exclusion patterns; `*` wildcards allowed.
    pub exclude: Option<String>,
}

/// Analytics parameters plus a top-N limit.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct TopParams {
    /// Restrict to one source ID.
    pub source: Option<String>,
    /// Time-range token, defaults to `24h`.
    pub range: Option<String>,
    /// Comma-separated domain exclusion patterns.
    pub exclude: Option<String>,
    /// Number of entries per partition. Defaults to 10, max 100.
    pub limit: Option<i64>,
}

impl TopParams {
    /// Effective limit, clamped to `1..=100`.
    #[must_use]
    pub fn clamped_limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }
}

/// Device-usage parameters.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct DeviceParams {
    /// Restrict to one source ID.
    pub source: Option<String>,
    /// Time-range token, defaults to `24h`.
    pub range: Option<String>,
    /// Comma-separated domain exclusion patterns.
    pub exclude: Option<String>,
    /// Comma-separated device names to drop (case-insensitive).
    pub exclude_devices: Option<String>,
    /// Number of devices. Defaults to 10, max 100.
    pub limit: Option<i64>,
}

/// Time-series parameters.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct SeriesParams {
    /// Restrict to one source ID.
    pub source: Option<String>,
    /// Time-range token, defaults to `24h`.
    pub range: Option<String>,
    /// Comma-separated domain exclusion patterns.
    pub exclude: Option<String>,
    /// `status` (default) or `source`.
    pub group_by: Option<String>,
}

/// Log listing parameters.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct LogsParams {
    /// Restrict to one source ID.
    pub source: Option<String>,
    /// Time-range token; `all` lists without a time cutoff.
    pub range: Option<String>,
    /// Case-insensitive domain substring search.
    pub search: Option<String>,
    /// `all` (default), `blocked`, or `allowed`.
    pub status: Option<String>,
    /// Comma-separated device names to keep.
    pub devices: Option<String>,
    /// Comma-separated domain exclusion patterns.
    pub exclude: Option<String>,
    /// Page size. Defaults to 50, max 1000.
    pub limit: Option<i64>,
    /// Page offset. Defaults to 0.
    pub offset: Option<i64>,
}

/// One page of log records plus the total match count.
#[derive(Debug, Serialize, ToSchema)]
pub struct LogsResponse {
    /// Records, newest first.
    pub data: Vec<LogRecord>,
    /// Total matching records before pagination.
    pub total: i64,
    /// Applied page size.
    pub limit: i64,
    /// Applied page offset.
    pub offset: i64,
}

/// Result of a manually triggered ingestion cycle.
#[derive(Debug, Serialize, ToSchema)]
pub struct IngestRunResponse {
    /// New records stored this cycle.
    pub new_records: u64,
    /// Records skipped as duplicates.
    pub duplicates: u64,
    /// Sources that completed.
    pub sources_succeeded: u32,
    /// Sources that failed; their errors were logged and isolated.
    pub sources_failed: u32,
}

impl From<CycleSummary> for IngestRunResponse {
    fn from(summary: CycleSummary) -> Self {
        Self {
            new_records: summary.new_records,
            duplicates: summary.duplicates,
            sources_succeeded: summary.sources_succeeded,
            sources_failed: summary.sources_failed,
        }
    }
}

/// One configured source with its fetch progress.
#[derive(Debug, Serialize, ToSchema)]
pub struct SourceStatusDto {
    /// Upstream profile identifier.
    pub source_id: String,
    /// Display name, when known.
    pub name: Option<String>,
    /// Disabled sources are skipped by the scheduler.
    pub enabled: bool,
    /// Watermark of the newest stored record, when a cycle has run.
    pub last_record_timestamp: Option<DateTime<Utc>>,
    /// Wall-clock time of the last successful fetch.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Running total of records stored from this source.
    pub records_fetched: i64,
}

/// Body for `PUT /sources/{id}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SourceUpsertRequest {
    /// Optional display name; an existing name is kept when omitted.
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the scheduler should fetch this source. Defaults to true.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Body for `PUT /settings/{key}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SettingUpdateRequest {
    /// New value for the setting.
    pub value: String,
}

/// One runtime setting.
#[derive(Debug, Serialize, ToSchema)]
pub struct SettingDto {
    /// Setting key.
    pub key: String,
    /// Stored value.
    pub value: String,
}
