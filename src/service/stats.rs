//! Rollup analytics over the log store.
//!
//! Every entry point takes an optional source filter, a time-range
//! token, and an optional domain-exclusion list. The range is resolved
//! once and the exclusion compiled once per request, then both feed the
//! store's shared predicate before the per-aggregation branching.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::time_range::{RangeToken, ResolvedRange, resolve};
use crate::domain::{DomainExclusion, device_display_name};
use crate::error::LensError;
use crate::persistence::{BaseFilter, LogStore};

/// Display name used when a record carries no parseable device blob.
pub const UNIDENTIFIED_DEVICE: &str = "Unidentified Device";

/// Overview counters for the filtered population.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatsOverview {
    /// All matching queries.
    pub total: i64,
    /// Blocked queries.
    pub blocked: i64,
    /// Allowed queries; always `total - blocked`.
    pub allowed: i64,
    /// `blocked / total * 100`, 0 when the population is empty.
    pub blocked_percentage: f64,
    /// `total / nominal hours of the token`. For `all` the divisor is
    /// the degenerate 1 — see [`RangeToken::nominal_hours`].
    pub queries_per_hour: f64,
    /// Name from the most recent record carrying a device blob.
    pub most_active_device: Option<String>,
    /// Highest-count domain among blocked records, same filters.
    pub top_blocked_domain: Option<String>,
    /// The token this overview was computed for.
    pub time_range: String,
}

/// One ranked group (domain or TLD) within a blocked/allowed partition.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RankedEntry {
    /// Domain or TLD.
    pub name: String,
    /// Query count in the partition.
    pub count: i64,
    /// Share of the *overall* filtered total, so blocked and allowed
    /// entries are comparable on one scale.
    pub percentage: f64,
}

/// Top domains or TLDs, partitioned by blocked status.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TopGroups {
    /// Top entries among blocked records.
    pub blocked: Vec<RankedEntry>,
    /// Top entries among allowed records.
    pub allowed: Vec<RankedEntry>,
    /// Overall filtered total the percentages are computed against.
    pub total: i64,
}

/// Per-device usage rollup.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeviceUsage {
    /// Parsed display name, or [`UNIDENTIFIED_DEVICE`].
    pub device_name: String,
    /// All queries from this device.
    pub total_queries: i64,
    /// Blocked queries from this device.
    pub blocked_queries: i64,
    /// Allowed queries from this device.
    pub allowed_queries: i64,
    /// Most recent `occurred_at` seen for this device.
    pub last_activity: DateTime<Utc>,
}

/// One time-series bucket split into blocked/allowed counts.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusBucket {
    /// Alignment-normalized bucket start.
    pub bucket_start: DateTime<Utc>,
    /// All queries in `[bucket_start, bucket_start + span)`.
    pub total: i64,
    /// Blocked queries in the bucket.
    pub blocked: i64,
    /// Allowed queries in the bucket.
    pub allowed: i64,
}

/// Per-source count within one bucket.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SourceCount {
    /// Source ID.
    pub source_id: String,
    /// Queries from that source in the bucket.
    pub count: i64,
}

/// One time-series bucket split per source.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SourceBucket {
    /// Alignment-normalized bucket start.
    pub bucket_start: DateTime<Utc>,
    /// One entry per source in the range's legend, zero-filled.
    pub counts: Vec<SourceCount>,
}

/// How to split time-series buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SeriesGrouping {
    /// Blocked vs allowed.
    #[default]
    Status,
    /// One count per source.
    Source,
}

impl std::str::FromStr for SeriesGrouping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(Self::Status),
            "source" => Ok(Self::Source),
            other => Err(format!("unknown series grouping: {other}")),
        }
    }
}

/// Time-series result; callers pattern-match on the grouping instead
/// of probing a dynamic shape.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "grouping", rename_all = "snake_case")]
pub enum TimeSeries {
    /// Blocked/allowed split per bucket.
    ByStatus {
        /// The buckets, in ascending order.
        buckets: Vec<StatusBucket>,
    },
    /// Per-source split per bucket.
    BySource {
        /// The buckets, in ascending order.
        buckets: Vec<SourceBucket>,
        /// Every source observed across the whole range, for legends —
        /// present even for buckets where a source had zero traffic.
        sources: Vec<String>,
    },
}

/// Aggregation engine over a [`LogStore`].
pub struct StatsService {
    store: Arc<dyn LogStore>,
}

impl std::fmt::Debug for StatsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsService").finish_non_exhaustive()
    }
}

impl StatsService {
    /// Creates a service over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Resolves the token once per request; only `all` touches the store.
    async fn resolved_range(
        &self,
        token: RangeToken,
        source_id: Option<&str>,
    ) -> Result<ResolvedRange, LensError> {
        let earliest = if token == RangeToken::All {
            self.store.earliest_occurred_at(source_id).await?
        } else {
            None
        };
        Ok(resolve(token, Utc::now(), earliest))
    }

    fn base_filter(
        source_id: Option<&str>,
        range: ResolvedRange,
        exclude: &[String],
    ) -> BaseFilter {
        BaseFilter {
            source_id: source_id.map(ToString::to_string),
            since: Some(range.start),
            exclusion: DomainExclusion::compile(exclude),
        }
    }

    /// Total/blocked/allowed overview with derived ratios.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Store`] when the store is unreachable.
    pub async fn overview(
        &self,
        source_id: Option<&str>,
        token: RangeToken,
        exclude: &[String],
    ) -> Result<StatsOverview, LensError> {
        let range = self.resolved_range(token, source_id).await?;
        let filter = Self::base_filter(source_id, range, exclude);

        let counts = self.store.count_by_status(&filter).await?;
        let most_active_device = self
            .store
            .most_recent_device(&filter)
            .await?
            .as_ref()
            .and_then(|d| device_display_name(Some(d)));
        let top_blocked_domain = self
            .store
            .top_domains(&filter, true, 1)
            .await?
            .into_iter()
            .next()
            .map(|g| g.key);

        #[allow(clippy::cast_precision_loss)]
        let queries_per_hour = round1(counts.total as f64 / token.nominal_hours());

        Ok(StatsOverview {
            total: counts.total,
            blocked: counts.blocked,
            allowed: counts.total - counts.blocked,
            blocked_percentage: percentage(counts.blocked, counts.total),
            queries_per_hour,
            most_active_device,
            top_blocked_domain,
            time_range: token.as_str().to_string(),
        })
    }

    /// Top domains per blocked/allowed partition.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Store`] when the store is unreachable.
    pub async fn top_domains(
        &self,
        source_id: Option<&str>,
        token: RangeToken,
        exclude: &[String],
        limit: i64,
    ) -> Result<TopGroups, LensError> {
        let range = self.resolved_range(token, source_id).await?;
        let filter = Self::base_filter(source_id, range, exclude);
        let total = self.store.count_by_status(&filter).await?.total;

        let blocked = self.store.top_domains(&filter, true, limit).await?;
        let allowed = self.store.top_domains(&filter, false, limit).await?;
        Ok(TopGroups {
            blocked: ranked(blocked, total),
            allowed: ranked(allowed, total),
            total,
        })
    }

    /// Top TLDs per blocked/allowed partition.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Store`] when the store is unreachable.
    pub async fn top_tlds(
        &self,
        source_id: Option<&str>,
        token: RangeToken,
        exclude: &[String],
        limit: i64,
    ) -> Result<TopGroups, LensError> {
        let range = self.resolved_range(token, source_id).await?;
        let filter = Self::base_filter(source_id, range, exclude);
        let total = self.store.count_by_status(&filter).await?.total;

        let blocked = self.store.top_tlds(&filter, true, limit).await?;
        let allowed = self.store.top_tlds(&filter, false, limit).await?;
        Ok(TopGroups {
            blocked: ranked(blocked, total),
            allowed: ranked(allowed, total),
            total,
        })
    }

    /// Per-device usage, top-N by total queries.
    ///
    /// Records without a parseable device name aggregate under
    /// [`UNIDENTIFIED_DEVICE`]. `exclude_devices` is matched
    /// case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Store`] when the store is unreachable.
    pub async fn device_usage(
        &self,
        source_id: Option<&str>,
        token: RangeToken,
        exclude: &[String],
        exclude_devices: &[String],
        limit: i64,
    ) -> Result<Vec<DeviceUsage>, LensError> {
        let range = self.resolved_range(token, source_id).await?;
        let filter = Self::base_filter(source_id, range, exclude);
        let rows = self.store.device_rows(&filter).await?;

        let excluded: Vec<String> = exclude_devices
            .iter()
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        let mut usage: HashMap<String, DeviceUsage> = HashMap::new();
        for row in rows {
            let name = device_display_name(row.device.as_ref())
                .unwrap_or_else(|| UNIDENTIFIED_DEVICE.to_string());
            if excluded.iter().any(|e| e == &name.to_lowercase()) {
                continue;
            }
            let entry = usage
                .entry(name.to_lowercase())
                .or_insert_with(|| DeviceUsage {
                    device_name: name,
                    total_queries: 0,
                    blocked_queries: 0,
                    allowed_queries: 0,
                    last_activity: row.occurred_at,
                });
            entry.total_queries += 1;
            if row.blocked {
                entry.blocked_queries += 1;
            } else {
                entry.allowed_queries += 1;
            }
            entry.last_activity = entry.last_activity.max(row.occurred_at);
        }

        let mut devices: Vec<DeviceUsage> = usage.into_values().collect();
        devices.sort_by(|a, b| {
            b.total_queries
                .cmp(&a.total_queries)
                .then_with(|| a.device_name.cmp(&b.device_name))
        });
        devices.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(devices)
    }

    /// Bucketed time series over the resolved range.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Store`] when the store is unreachable.
    pub async fn time_series(
        &self,
        source_id: Option<&str>,
        token: RangeToken,
        exclude: &[String],
        grouping: SeriesGrouping,
    ) -> Result<TimeSeries, LensError> {
        let range = self.resolved_range(token, source_id).await?;
        let filter = Self::base_filter(source_id, range, exclude);

        match grouping {
            SeriesGrouping::Status => {
                let mut buckets = Vec::with_capacity(range.bucket_count as usize);
                for (start, end) in range.buckets() {
                    let counts = self.store.bucket_status_counts(&filter, start, end).await?;
                    buckets.push(StatusBucket {
                        bucket_start: start,
                        total: counts.total,
                        blocked: counts.blocked,
                        allowed: counts.total - counts.blocked,
                    });
                }
                Ok(TimeSeries::ByStatus { buckets })
            }
            SeriesGrouping::Source => {
                let sources = self.store.distinct_sources(&filter).await?;
                let mut buckets = Vec::with_capacity(range.bucket_count as usize);
                for (start, end) in range.buckets() {
                    let observed = self.store.bucket_source_counts(&filter, start, end).await?;
                    let by_source: HashMap<&str, i64> = observed
                        .iter()
                        .map(|g| (g.key.as_str(), g.count))
                        .collect();
                    buckets.push(SourceBucket {
                        bucket_start: start,
                        counts: sources
                            .iter()
                            .map(|source| SourceCount {
                                source_id: source.clone(),
                                count: by_source.get(source.as_str()).copied().unwrap_or(0),
                            })
                            .collect(),
                    });
                }
                Ok(TimeSeries::BySource { buckets, sources })
            }
        }
    }
}

/// `part / total * 100` rounded to one decimal; 0 for an empty total.
#[allow(clippy::cast_precision_loss)]
fn percentage(part: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round1(part as f64 / total as f64 * 100.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn ranked(groups: Vec<crate::persistence::GroupCount>, total: i64) -> Vec<RankedEntry> {
    groups
        .into_iter()
        .map(|g| RankedEntry {
            percentage: percentage(g.count, total),
            name: g.key,
            count: g.count,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{DeviceInfo, NewLogRecord};
    use crate::persistence::memory::MemoryStore;
    use chrono::Duration;
    use serde_json::json;

    fn record(
        minutes_ago: i64,
        domain: &str,
        blocked: bool,
        device: Option<&str>,
        source: &str,
    ) -> NewLogRecord {
        NewLogRecord {
            occurred_at: Utc::now() - Duration::minutes(minutes_ago),
            domain: domain.to_string(),
            action: if blocked { "blocked" } else { "allowed" }.to_string(),
            blocked,
            device: device.map(|name| DeviceInfo {
                id: None,
                name: Some(name.to_string()),
            }),
            client_address: Some(format!("10.0.0.{}", minutes_ago % 250)),
            query_type: "A".to_string(),
            source_id: source.to_string(),
            raw_payload: json!({"domain": domain}),
        }
    }

    async fn seed(store: &MemoryStore, records: Vec<NewLogRecord>) {
        for rec in records {
            let Ok(outcome) = store.insert_if_new(&rec).await else {
                panic!("seed insert failed");
            };
            assert!(outcome.is_new, "seed records must be unique");
        }
    }

    fn service(store: Arc<MemoryStore>) -> StatsService {
        StatsService::new(store)
    }

    #[tokio::test]
    async fn overview_counts_and_percentages() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            vec![
                record(1, "ads.example.com", true, Some("iPhone"), "abc"),
                record(2, "example.com", false, Some("iPhone"), "abc"),
                record(3, "google.com", false, None, "abc"),
                record(4, "ads.example.com", true, Some("MacBook"), "abc"),
            ],
        )
        .await;

        let stats = service(store);
        let Ok(overview) = stats.overview(None, RangeToken::H24, &[]).await else {
            panic!("overview failed");
        };

        assert_eq!(overview.total, 4);
        assert_eq!(overview.blocked + overview.allowed, overview.total);
        assert_eq!(overview.blocked_percentage, 50.0);
        assert!((0.0..=100.0).contains(&overview.blocked_percentage));
        assert_eq!(overview.top_blocked_domain.as_deref(), Some("ads.example.com"));
        // Most recent device-carrying record wins.
        assert_eq!(overview.most_active_device.as_deref(), Some("iPhone"));
        assert_eq!(overview.time_range, "24h");
    }

    #[tokio::test]
    async fn overview_of_empty_store_is_all_zero() {
        let stats = service(Arc::new(MemoryStore::new()));
        let Ok(overview) = stats.overview(None, RangeToken::H24, &[]).await else {
            panic!("overview failed");
        };
        assert_eq!(overview.total, 0);
        assert_eq!(overview.blocked_percentage, 0.0);
        assert_eq!(overview.queries_per_hour, 0.0);
        assert_eq!(overview.most_active_device, None);
        assert_eq!(overview.top_blocked_domain, None);
    }

    #[tokio::test]
    async fn queries_per_hour_uses_the_nominal_divisor() {
        let store = Arc::new(MemoryStore::new());
        let mut records = Vec::new();
        for i in 0..48 {
            records.push(record(i + 1, &format!("d{i}.example.com"), false, None, "abc"));
        }
        seed(&store, records).await;

        let stats = service(store);
        let Ok(day) = stats.overview(None, RangeToken::H24, &[]).await else {
            panic!("overview failed");
        };
        assert_eq!(day.queries_per_hour, 2.0);

        // The documented quirk: for `all` the divisor is 1.
        let Ok(all) = stats.overview(None, RangeToken::All, &[]).await else {
            panic!("overview failed");
        };
        assert_eq!(all.queries_per_hour, 48.0);
    }

    #[tokio::test]
    async fn top_domains_percentages_are_against_the_overall_total() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            vec![
                record(1, "ads.example.com", true, None, "abc"),
                record(2, "ads.example.com", true, None, "abc"),
                record(3, "example.com", false, None, "abc"),
                record(4, "google.com", false, None, "abc"),
            ],
        )
        .await;

        let stats = service(store);
        let Ok(top) = stats.top_domains(None, RangeToken::H24, &[], 10).await else {
            panic!("top domains failed");
        };
        assert_eq!(top.total, 4);
        assert_eq!(
            top.blocked,
            vec![RankedEntry {
                name: "ads.example.com".to_string(),
                count: 2,
                percentage: 50.0
            }]
        );
        let blocked_sum: i64 = top.blocked.iter().map(|e| e.count).sum();
        assert!(blocked_sum <= top.total);
        assert_eq!(top.allowed.len(), 2);
        assert!(top.allowed.iter().all(|e| e.percentage == 25.0));
    }

    #[tokio::test]
    async fn top_tlds_group_on_derived_labels() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            vec![
                record(1, "gateway.icloud.com", false, None, "abc"),
                record(2, "www.icloud.com", false, None, "abc"),
                record(3, "tracking.net", true, None, "abc"),
            ],
        )
        .await;

        let stats = service(store);
        let Ok(top) = stats.top_tlds(None, RangeToken::H24, &[], 10).await else {
            panic!("top tlds failed");
        };
        assert_eq!(
            top.allowed.first().map(|e| e.name.as_str()),
            Some("icloud.com")
        );
        assert_eq!(top.allowed.first().map(|e| e.count), Some(2));
        assert_eq!(
            top.blocked.first().map(|e| e.name.as_str()),
            Some("tracking.net")
        );
    }

    #[tokio::test]
    async fn exclusion_list_applies_to_aggregations() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            vec![
                record(1, "a.apple.com", false, None, "abc"),
                record(2, "apple.com", false, None, "abc"),
                record(3, "tracking.net", true, None, "abc"),
                record(4, "x.tracking.net", true, None, "abc"),
                record(5, "ads.com", false, None, "abc"),
            ],
        )
        .await;

        let stats = service(store);
        let exclude = vec!["*.apple.com".to_string(), "*tracking*".to_string()];
        let Ok(overview) = stats.overview(None, RangeToken::H24, &exclude).await else {
            panic!("overview failed");
        };
        // Retained: apple.com and ads.com.
        assert_eq!(overview.total, 2);
        assert_eq!(overview.blocked, 0);
    }

    #[tokio::test]
    async fn degenerate_wildcard_excludes_nothing() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            vec![
                record(1, "example.com", false, None, "abc"),
                record(2, "google.com", false, None, "abc"),
            ],
        )
        .await;

        let stats = service(store);
        let Ok(overview) = stats
            .overview(None, RangeToken::H24, &["*".to_string()])
            .await
        else {
            panic!("overview failed");
        };
        assert_eq!(overview.total, 2);
    }

    #[tokio::test]
    async fn device_usage_aggregates_and_applies_sentinel() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            vec![
                record(1, "a.com", true, Some("iPhone"), "abc"),
                record(2, "b.com", false, Some("iPhone"), "abc"),
                record(3, "c.com", false, Some("MacBook"), "abc"),
                record(4, "d.com", false, None, "abc"),
            ],
        )
        .await;

        let stats = service(store);
        let Ok(devices) = stats
            .device_usage(None, RangeToken::H24, &[], &[], 10)
            .await
        else {
            panic!("device usage failed");
        };

        assert_eq!(devices.len(), 3);
        let Some(iphone) = devices.iter().find(|d| d.device_name == "iPhone") else {
            panic!("iPhone missing");
        };
        assert_eq!(iphone.total_queries, 2);
        assert_eq!(iphone.blocked_queries, 1);
        assert_eq!(iphone.allowed_queries, 1);
        assert!(devices.iter().any(|d| d.device_name == UNIDENTIFIED_DEVICE));
    }

    #[tokio::test]
    async fn device_exclusion_is_case_insensitive() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            vec![
                record(1, "a.com", false, Some("iPhone"), "abc"),
                record(2, "b.com", false, Some("MacBook"), "abc"),
            ],
        )
        .await;

        let stats = service(store);
        let Ok(devices) = stats
            .device_usage(None, RangeToken::H24, &[], &["IPHONE".to_string()], 10)
            .await
        else {
            panic!("device usage failed");
        };
        assert_eq!(devices.len(), 1);
        assert_eq!(
            devices.first().map(|d| d.device_name.as_str()),
            Some("MacBook")
        );
    }

    #[tokio::test]
    async fn status_series_has_24_buckets_that_sum_to_the_total() {
        let store = Arc::new(MemoryStore::new());
        let mut records = Vec::new();
        for i in 0..40 {
            // Spread over ~20 hours, mixed blocked/allowed.
            records.push(record(
                i * 30 + 5,
                &format!("d{i}.example.com"),
                i % 3 == 0,
                None,
                "abc",
            ));
        }
        seed(&store, records).await;

        let stats = service(store);
        let Ok(series) = stats
            .time_series(None, RangeToken::H24, &[], SeriesGrouping::Status)
            .await
        else {
            panic!("series failed");
        };
        let TimeSeries::ByStatus { buckets } = series else {
            panic!("expected status grouping");
        };
        assert_eq!(buckets.len(), 24);
        for pair in buckets.windows(2) {
            if let [a, b] = pair {
                assert!(a.bucket_start < b.bucket_start);
                assert_eq!(b.bucket_start - a.bucket_start, Duration::hours(1));
            }
        }

        let Ok(overview) = stats.overview(None, RangeToken::H24, &[]).await else {
            panic!("overview failed");
        };
        let bucket_total: i64 = buckets.iter().map(|b| b.total).sum();
        assert_eq!(bucket_total, overview.total);
        let bucket_blocked: i64 = buckets.iter().map(|b| b.blocked).sum();
        assert_eq!(bucket_blocked, overview.blocked);
    }

    #[tokio::test]
    async fn source_series_zero_fills_the_legend() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            vec![
                record(10, "a.com", false, None, "one"),
                record(20, "b.com", false, None, "two"),
            ],
        )
        .await;

        let stats = service(store);
        let Ok(series) = stats
            .time_series(None, RangeToken::H24, &[], SeriesGrouping::Source)
            .await
        else {
            panic!("series failed");
        };
        let TimeSeries::BySource { buckets, sources } = series else {
            panic!("expected source grouping");
        };
        assert_eq!(sources, vec!["one".to_string(), "two".to_string()]);
        // Every bucket carries a count for every legend source.
        assert!(
            buckets
                .iter()
                .all(|b| b.counts.iter().map(|c| c.source_id.as_str()).eq(["one", "two"]))
        );
        let total: i64 = buckets
            .iter()
            .flat_map(|b| b.counts.iter().map(|c| c.count))
            .sum();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn source_filter_restricts_everything() {
        let store = Arc::new(MemoryStore::new());
        seed(
            &store,
            vec![
                record(1, "a.com", false, None, "one"),
                record(2, "b.com", true, None, "two"),
            ],
        )
        .await;

        let stats = service(store);
        let Ok(overview) = stats.overview(Some("one"), RangeToken::H24, &[]).await else {
            panic!("overview failed");
        };
        assert_eq!(overview.total, 1);
        assert_eq!(overview.blocked, 0);
    }
}
