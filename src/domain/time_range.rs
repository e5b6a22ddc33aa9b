//! Symbolic time-range resolution and bucket generation.
//!
//! Maps a range token (`30m`, `1h`, ..., `all`) to a concrete start
//! time, bucket granularity, and bucket count. The same resolution
//! feeds both the simple cutoff filter used by scalar aggregations and
//! the bucket list used by time-series generation, so their windows
//! always agree.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Symbolic time-range token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeToken {
    /// Last 30 minutes.
    #[serde(rename = "30m")]
    M30,
    /// Last hour.
    #[serde(rename = "1h")]
    H1,
    /// Last 6 hours.
    #[serde(rename = "6h")]
    H6,
    /// Last 24 hours.
    #[serde(rename = "24h")]
    H24,
    /// Last 7 days.
    #[serde(rename = "7d")]
    D7,
    /// Last 30 days.
    #[serde(rename = "30d")]
    D30,
    /// Last 3 months (13 calendar weeks).
    #[serde(rename = "3m")]
    M3,
    /// Everything since the earliest stored record.
    #[serde(rename = "all")]
    All,
}

impl RangeToken {
    /// The canonical token string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H6 => "6h",
            Self::H24 => "24h",
            Self::D7 => "7d",
            Self::D30 => "30d",
            Self::M3 => "3m",
            Self::All => "all",
        }
    }

    /// Nominal duration of the token in hours, used as the
    /// queries-per-hour divisor.
    ///
    /// `all` returns 1 as a degenerate fallback. That makes
    /// queries-per-hour equal the total for the unbounded range — a
    /// long-standing quirk of the original formula, preserved rather
    /// than silently corrected.
    #[must_use]
    pub fn nominal_hours(self) -> f64 {
        match self {
            Self::M30 => 0.5,
            Self::H1 => 1.0,
            Self::H6 => 6.0,
            Self::H24 => 24.0,
            Self::D7 => 168.0,
            Self::D30 => 720.0,
            Self::M3 => 2160.0,
            Self::All => 1.0,
        }
    }
}

impl FromStr for RangeToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "30m" => Ok(Self::M30),
            "1h" => Ok(Self::H1),
            "6h" => Ok(Self::H6),
            "24h" => Ok(Self::H24),
            "7d" => Ok(Self::D7),
            "30d" => Ok(Self::D30),
            "3m" => Ok(Self::M3),
            "all" => Ok(Self::All),
            other => Err(format!("unknown time range token: {other}")),
        }
    }
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket granularity. Buckets are always aligned to the granularity's
/// natural boundary (exact minute, top of the hour, midnight, Monday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Fixed-size minute buckets.
    Minutes(u32),
    /// Hourly buckets.
    Hour,
    /// Daily buckets.
    Day,
    /// Weekly buckets starting on Monday.
    Week,
}

impl Granularity {
    /// Width of one bucket.
    #[must_use]
    pub fn span(self) -> Duration {
        match self {
            Self::Minutes(n) => Duration::minutes(i64::from(n)),
            Self::Hour => Duration::hours(1),
            Self::Day => Duration::days(1),
            Self::Week => Duration::weeks(1),
        }
    }

    /// Floors a timestamp to this granularity's boundary.
    ///
    /// Day and week alignment use UTC midnight; the Unix epoch fell on
    /// a Thursday, hence the +3 offset for Monday alignment.
    #[must_use]
    pub fn align(self, t: DateTime<Utc>) -> DateTime<Utc> {
        let secs = t.timestamp();
        let aligned = match self {
            Self::Minutes(n) => secs - secs.rem_euclid(i64::from(n) * 60),
            Self::Hour => secs - secs.rem_euclid(3_600),
            Self::Day => secs - secs.rem_euclid(86_400),
            Self::Week => {
                let midnight = secs - secs.rem_euclid(86_400);
                let days_from_monday = ((midnight / 86_400) + 3).rem_euclid(7);
                midnight - days_from_monday * 86_400
            }
        };
        DateTime::from_timestamp(aligned, 0).unwrap_or(t)
    }
}

/// A resolved time range: window start plus bucketing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    /// Start of the first bucket; also the cutoff for non-bucketed
    /// queries over the same token, so bucket sums and scalar totals
    /// agree.
    pub start: DateTime<Utc>,
    /// Bucket width and alignment.
    pub granularity: Granularity,
    /// Number of buckets; the last bucket contains `now`.
    pub bucket_count: u32,
}

impl ResolvedRange {
    /// Generates the `[start, end)` pairs for every bucket.
    #[must_use]
    pub fn buckets(&self) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        let span = self.granularity.span();
        (0..self.bucket_count)
            .map(|i| {
                let start = self.start + span * i32::try_from(i).unwrap_or(i32::MAX);
                (start, start + span)
            })
            .collect()
    }
}

/// Resolves a token to a concrete range.
///
/// `earliest` is the minimum `occurred_at` over the (optionally
/// source-filtered) data set; it is only consulted for
/// [`RangeToken::All`]. With no data the unbounded range falls back to
/// a 30-day window. Spans of at most 90 days get daily buckets
/// covering exactly the span, longer spans switch to weekly buckets
/// from the Monday on/before the earliest record.
#[must_use]
pub fn resolve(
    token: RangeToken,
    now: DateTime<Utc>,
    earliest: Option<DateTime<Utc>>,
) -> ResolvedRange {
    let fixed = |granularity: Granularity, bucket_count: u32| {
        let last = granularity.align(now);
        ResolvedRange {
            start: last - granularity.span() * i32::try_from(bucket_count - 1).unwrap_or(i32::MAX),
            granularity,
            bucket_count,
        }
    };

    match token {
        RangeToken::M30 => fixed(Granularity::Minutes(1), 30),
        RangeToken::H1 => fixed(Granularity::Minutes(5), 12),
        RangeToken::H6 => fixed(Granularity::Minutes(30), 12),
        RangeToken::H24 => fixed(Granularity::Hour, 24),
        RangeToken::D7 => fixed(Granularity::Day, 7),
        RangeToken::D30 => fixed(Granularity::Day, 30),
        RangeToken::M3 => fixed(Granularity::Week, 13),
        RangeToken::All => {
            let earliest = earliest.unwrap_or(now - Duration::days(30));
            let span_days = (now - earliest).num_days();
            let granularity = if span_days <= 90 {
                Granularity::Day
            } else {
                Granularity::Week
            };
            let start = granularity.align(earliest);
            let last = granularity.align(now);
            let steps = (last - start).num_seconds() / granularity.span().num_seconds();
            ResolvedRange {
                start,
                granularity,
                bucket_count: u32::try_from(steps).unwrap_or(0) + 1,
            }
        }
    }
}
