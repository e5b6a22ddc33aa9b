//! The log store contract and its query/result types.
//!
//! [`LogStore`] is the seam between the ingestion pipeline, the
//! aggregation engine, and the storage engine. The production
//! implementation is [`PgStore`](super::postgres::PgStore); tests use
//! an in-memory double with the same dedup semantics.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{DeviceInfo, DomainExclusion, LogRecord, NewLogRecord};
use crate::error::LensError;

/// Result of an insert-with-dedup attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Row ID: the new row's ID, or the existing row's ID on a duplicate.
    pub id: i64,
    /// `true` when a new row was stored.
    pub is_new: bool,
}

/// Total and blocked counts over a filtered population.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    /// All matching records.
    pub total: i64,
    /// Matching records with `blocked = true`.
    pub blocked: i64,
}

/// One group-by bucket: a key (domain, TLD, or source ID) and its count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCount {
    /// Group key.
    pub key: String,
    /// Number of matching records in the group.
    pub count: i64,
}

/// Minimal projection used by the device-usage aggregation.
#[derive(Debug, Clone)]
pub struct DeviceRow {
    /// Parsed device blob, when present.
    pub device: Option<DeviceInfo>,
    /// Blocked flag.
    pub blocked: bool,
    /// Event timestamp.
    pub occurred_at: DateTime<Utc>,
}

/// Filters shared by every read path.
///
/// The domain exclusion predicate is compiled once per request and
/// applied identically here and in the in-memory checks — see
/// [`DomainExclusion`].
#[derive(Debug, Clone, Default)]
pub struct BaseFilter {
    /// Restrict to one source.
    pub source_id: Option<String>,
    /// Keep records with `occurred_at >= since`.
    pub since: Option<DateTime<Utc>>,
    /// Compiled domain exclusion; `None` excludes nothing.
    pub exclusion: Option<DomainExclusion>,
}

/// Blocked/allowed/all record status filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    /// No status restriction.
    #[default]
    All,
    /// Only blocked records.
    Blocked,
    /// Only allowed records.
    Allowed,
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "blocked" => Ok(Self::Blocked),
            "allowed" => Ok(Self::Allowed),
            other => Err(format!("unknown status filter: {other}")),
        }
    }
}

/// Full record listing query: base filters plus search, status,
/// device restriction, and pagination.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    /// Shared filters.
    pub base: BaseFilter,
    /// Free-text domain substring search.
    pub search: Option<String>,
    /// Blocked/allowed/all.
    pub status: StatusFilter,
    /// Keep only records whose device name is in this list (empty =
    /// no restriction).
    pub devices: Vec<String>,
    /// Page size.
    pub limit: i64,
    /// Page offset.
    pub offset: i64,
}

/// One fetch cursor row, one per source.
#[derive(Debug, Clone, Serialize)]
pub struct FetchCursor {
    /// Source this cursor belongs to.
    pub source_id: String,
    /// Watermark: `occurred_at` of the newest record stored for this
    /// source. Only ever advances.
    pub last_record_timestamp: DateTime<Utc>,
    /// Wall-clock time of the last cycle that advanced this cursor.
    pub last_success_at: DateTime<Utc>,
    /// Monotonically increasing count of new records stored.
    pub records_fetched: i64,
    /// Row update time.
    pub updated_at: DateTime<Utc>,
}

/// One configured upstream source.
#[derive(Debug, Clone, Serialize)]
pub struct Source {
    /// Upstream account/profile identifier.
    pub source_id: String,
    /// Display name fetched from the upstream, when known.
    pub name: Option<String>,
    /// Disabled sources are skipped by the scheduler.
    pub enabled: bool,
}

/// The persistence contract consumed by the pipeline and the
/// aggregation engine.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Inserts a record unless a row with the same identity key
    /// (`occurred_at`, `domain`, `client_address`) already exists.
    /// Duplicate detection is the expected common case, not an error.
    async fn insert_if_new(&self, record: &NewLogRecord) -> Result<InsertOutcome, LensError>;

    /// Returns one page of records (newest first) plus the total
    /// matching count before pagination.
    async fn query_records(&self, query: &RecordQuery)
    -> Result<(Vec<LogRecord>, i64), LensError>;

    /// Cheap approximate row count from store-engine statistics.
    /// Display/health only — never correctness-sensitive.
    async fn estimated_total_count(&self) -> Result<i64, LensError>;

    /// Total and blocked counts over the filtered population.
    async fn count_by_status(&self, filter: &BaseFilter) -> Result<StatusCounts, LensError>;

    /// Top domains within one blocked partition, by descending count.
    async fn top_domains(
        &self,
        filter: &BaseFilter,
        blocked: bool,
        limit: i64,
    ) -> Result<Vec<GroupCount>, LensError>;

    /// Top TLDs within one blocked partition, by descending count.
    async fn top_tlds(
        &self,
        filter: &BaseFilter,
        blocked: bool,
        limit: i64,
    ) -> Result<Vec<GroupCount>, LensError>;

    /// Device/blocked/timestamp projection of the filtered population.
    async fn device_rows(&self, filter: &BaseFilter) -> Result<Vec<DeviceRow>, LensError>;

    /// Status counts restricted to `[start, end)`.
    async fn bucket_status_counts(
        &self,
        filter: &BaseFilter,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<StatusCounts, LensError>;

    /// Per-source counts restricted to `[start, end)`.
    async fn bucket_source_counts(
        &self,
        filter: &BaseFilter,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<GroupCount>, LensError>;

    /// Distinct source IDs observed in the filtered population.
    async fn distinct_sources(&self, filter: &BaseFilter) -> Result<Vec<String>, LensError>;

    /// Minimum `occurred_at`, optionally restricted to one source.
    async fn earliest_occurred_at(
        &self,
        source_id: Option<&str>,
    ) -> Result<Option<DateTime<Utc>>, LensError>;

    /// Device blob of the most recent record that carries one.
    async fn most_recent_device(
        &self,
        filter: &BaseFilter,
    ) -> Result<Option<DeviceInfo>, LensError>;

    /// Fetch cursor for one source, if it has ever completed a cycle.
    async fn get_cursor(&self, source_id: &str) -> Result<Option<FetchCursor>, LensError>;

    /// Creates or advances a cursor. The watermark never regresses and
    /// `new_records` accumulates onto the running total.
    async fn advance_cursor(
        &self,
        source_id: &str,
        watermark: DateTime<Utc>,
        new_records: i64,
    ) -> Result<(), LensError>;

    /// Sources the scheduler iterates this cycle.
    async fn list_enabled_sources(&self) -> Result<Vec<Source>, LensError>;

    /// Records the upstream display name for a source. A no-op for an
    /// unknown source.
    async fn set_source_name(&self, source_id: &str, name: &str) -> Result<(), LensError>;

    /// Reads one runtime setting. Re-read every cycle so configuration
    /// changes apply without restart.
    async fn get_setting(&self, key: &str) -> Result<Option<String>, LensError>;
}
