//! PostgreSQL implementation of the log store.
//!
//! All dynamic SQL goes through [`push_base_filters`] so every read
//! path — listing, stats, top domains/TLDs, device usage, time series —
//! applies the exact same predicate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::Postgres;
use sqlx::{PgPool, QueryBuilder};

use super::store::{
    BaseFilter, DeviceRow, FetchCursor, GroupCount, InsertOutcome, LogStore, RecordQuery, Source,
    StatusCounts, StatusFilter,
};
use crate::domain::{DeviceInfo, LogRecord, NewLogRecord, derive_tld};
use crate::error::LensError;

/// PostgreSQL-backed log store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

/// Raw `dns_logs` row tuple as selected by [`RECORD_COLUMNS`].
type RecordRow = (
    i64,
    DateTime<Utc>,
    String,
    Option<String>,
    String,
    bool,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    String,
    DateTime<Utc>,
);

const RECORD_COLUMNS: &str = "id, occurred_at, domain, tld, action, blocked, device, \
     client_address, query_type, source_id, raw_payload, created_at";

impl PgStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Writes one runtime setting (insert or update).
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Store`] on database failure.
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<(), LensError> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Creates a source or updates its name/enabled flag.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Store`] on database failure.
    pub async fn upsert_source(
        &self,
        source_id: &str,
        name: Option<&str>,
        enabled: bool,
    ) -> Result<(), LensError> {
        sqlx::query(
            "INSERT INTO sources (source_id, name, enabled) VALUES ($1, $2, $3) \
             ON CONFLICT (source_id) DO UPDATE SET \
                 name = COALESCE(EXCLUDED.name, sources.name), \
                 enabled = EXCLUDED.enabled, \
                 updated_at = now()",
        )
        .bind(source_id)
        .bind(name)
        .bind(enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Removes a source along with its log records and fetch cursor.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::SourceNotFound`] when the source does not
    /// exist, or [`LensError::Store`] on database failure.
    pub async fn remove_source(&self, source_id: &str) -> Result<(), LensError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM sources WHERE source_id = $1")
            .bind(source_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(LensError::SourceNotFound(source_id.to_string()));
        }
        sqlx::query("DELETE FROM fetch_cursors WHERE source_id = $1")
            .bind(source_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM dns_logs WHERE source_id = $1")
            .bind(source_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Lists every configured source, enabled or not.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Store`] on database failure.
    pub async fn list_sources(&self) -> Result<Vec<Source>, LensError> {
        let rows = sqlx::query_as::<_, (String, Option<String>, bool)>(
            "SELECT source_id, name, enabled FROM sources ORDER BY source_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(source_id, name, enabled)| Source {
                source_id,
                name,
                enabled,
            })
            .collect())
    }

    /// `true` when the settings table has no rows yet (first boot).
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Store`] on database failure.
    pub async fn settings_empty(&self) -> Result<bool, LensError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM settings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count == 0)
    }
}

/// Appends the shared WHERE conditions for a [`BaseFilter`].
///
/// The query must already contain a `WHERE` clause (conventionally
/// `WHERE TRUE`) so every condition can start with ` AND`.
fn push_base_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &BaseFilter) {
    if let Some(source_id) = &filter.source_id {
        qb.push(" AND source_id = ").push_bind(source_id.clone());
    }
    if let Some(since) = filter.since {
        qb.push(" AND occurred_at >= ").push_bind(since);
    }
    if let Some(exclusion) = &filter.exclusion {
        if !exclusion.exact().is_empty() {
            qb.push(" AND LOWER(domain) <> ALL(")
                .push_bind(exclusion.exact().to_vec())
                .push(")");
        }
        let likes = exclusion.like_patterns();
        if !likes.is_empty() {
            qb.push(" AND NOT (");
            for (i, pattern) in likes.into_iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push("domain ILIKE ").push_bind(pattern);
            }
            qb.push(")");
        }
    }
}

/// Appends the listing-only conditions of a [`RecordQuery`].
fn push_record_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &RecordQuery) {
    push_base_filters(qb, &query.base);
    if let Some(search) = &query.search {
        let trimmed = search.trim();
        if !trimmed.is_empty() {
            qb.push(" AND domain ILIKE ")
                .push_bind(format!("%{}%", escape_like(trimmed)));
        }
    }
    match query.status {
        StatusFilter::All => {}
        StatusFilter::Blocked => {
            qb.push(" AND blocked = TRUE");
        }
        StatusFilter::Allowed => {
            qb.push(" AND blocked = FALSE");
        }
    }
    if !query.devices.is_empty() {
        qb.push(" AND device::jsonb ->> 'name' = ANY(")
            .push_bind(query.devices.clone())
            .push(")");
    }
}

/// Escapes `LIKE` metacharacters in a search term.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn record_from_row(row: RecordRow) -> LogRecord {
    let (
        id,
        occurred_at,
        domain,
        tld,
        action,
        blocked,
        device,
        client_address,
        query_type,
        source_id,
        raw_payload,
        created_at,
    ) = row;
    LogRecord {
        id,
        occurred_at,
        domain,
        tld,
        action,
        blocked,
        device: device.as_deref().and_then(parse_device),
        client_address,
        query_type,
        source_id,
        raw_payload: serde_json::from_str(&raw_payload)
            .unwrap_or(serde_json::Value::String(raw_payload)),
        created_at,
    }
}

fn parse_device(text: &str) -> Option<DeviceInfo> {
    serde_json::from_str(text).ok()
}

#[async_trait]
impl LogStore for PgStore {
    async fn insert_if_new(&self, record: &NewLogRecord) -> Result<InsertOutcome, LensError> {
        let tld = derive_tld(&record.domain);
        let device = record
            .device
            .as_ref()
            .and_then(|d| serde_json::to_string(d).ok());

        // Atomic insert-or-skip on the identity key; the separate
        // lookup only runs for the duplicate case.
        let inserted: Option<(i64,)> = sqlx::query_as(
            "INSERT INTO dns_logs \
                 (occurred_at, domain, tld, action, blocked, device, client_address, \
                  query_type, source_id, raw_payload) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT ON CONSTRAINT uq_dns_logs_identity DO NOTHING \
             RETURNING id",
        )
        .bind(record.occurred_at)
        .bind(&record.domain)
        .bind(tld)
        .bind(&record.action)
        .bind(record.blocked)
        .bind(device)
        .bind(&record.client_address)
        .bind(&record.query_type)
        .bind(&record.source_id)
        .bind(record.raw_payload.to_string())
        .fetch_optional(&self.pool)
        .await?;

        if let Some((id,)) = inserted {
            return Ok(InsertOutcome { id, is_new: true });
        }

        let (id,): (i64,) = sqlx::query_as(
            "SELECT id FROM dns_logs \
             WHERE occurred_at = $1 AND domain = $2 \
               AND client_address IS NOT DISTINCT FROM $3",
        )
        .bind(record.occurred_at)
        .bind(&record.domain)
        .bind(&record.client_address)
        .fetch_one(&self.pool)
        .await?;

        Ok(InsertOutcome { id, is_new: false })
    }

    async fn query_records(
        &self,
        query: &RecordQuery,
    ) -> Result<(Vec<LogRecord>, i64), LensError> {
        let mut count_qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM dns_logs WHERE TRUE");
        push_record_filters(&mut count_qb, query);
        let (matched,): (i64,) = count_qb.build_query_as().fetch_one(&self.pool).await?;

        let mut page_qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {RECORD_COLUMNS} FROM dns_logs WHERE TRUE"
        ));
        push_record_filters(&mut page_qb, query);
        page_qb
            .push(" ORDER BY occurred_at DESC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);
        let rows: Vec<RecordRow> = page_qb.build_query_as().fetch_all(&self.pool).await?;

        Ok((rows.into_iter().map(record_from_row).collect(), matched))
    }

    async fn estimated_total_count(&self) -> Result<i64, LensError> {
        // Planner statistics, not a scan. -1 means "never analyzed".
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT GREATEST(reltuples, 0)::BIGINT FROM pg_class WHERE relname = 'dns_logs'",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map_or(0, |(count,)| count))
    }

    async fn count_by_status(&self, filter: &BaseFilter) -> Result<StatusCounts, LensError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE blocked) FROM dns_logs WHERE TRUE",
        );
        push_base_filters(&mut qb, filter);
        let (total, blocked): (i64, i64) = qb.build_query_as().fetch_one(&self.pool).await?;
        Ok(StatusCounts { total, blocked })
    }

    async fn top_domains(
        &self,
        filter: &BaseFilter,
        blocked: bool,
        limit: i64,
    ) -> Result<Vec<GroupCount>, LensError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT domain, COUNT(*) AS queries FROM dns_logs WHERE TRUE",
        );
        push_base_filters(&mut qb, filter);
        qb.push(" AND blocked = ")
            .push_bind(blocked)
            .push(" GROUP BY domain ORDER BY queries DESC, domain LIMIT ")
            .push_bind(limit);
        let rows: Vec<(String, i64)> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(key, count)| GroupCount { key, count })
            .collect())
    }

    async fn top_tlds(
        &self,
        filter: &BaseFilter,
        blocked: bool,
        limit: i64,
    ) -> Result<Vec<GroupCount>, LensError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT tld, COUNT(*) AS queries FROM dns_logs WHERE tld IS NOT NULL",
        );
        push_base_filters(&mut qb, filter);
        qb.push(" AND blocked = ")
            .push_bind(blocked)
            .push(" GROUP BY tld ORDER BY queries DESC, tld LIMIT ")
            .push_bind(limit);
        let rows: Vec<(String, i64)> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(key, count)| GroupCount { key, count })
            .collect())
    }

    async fn device_rows(&self, filter: &BaseFilter) -> Result<Vec<DeviceRow>, LensError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT device, blocked, occurred_at FROM dns_logs WHERE TRUE",
        );
        push_base_filters(&mut qb, filter);
        let rows: Vec<(Option<String>, bool, DateTime<Utc>)> =
            qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(device, blocked, occurred_at)| DeviceRow {
                device: device.as_deref().and_then(parse_device),
                blocked,
                occurred_at,
            })
            .collect())
    }

    async fn bucket_status_counts(
        &self,
        filter: &BaseFilter,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<StatusCounts, LensError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE blocked) FROM dns_logs WHERE TRUE",
        );
        push_base_filters(&mut qb, filter);
        qb.push(" AND occurred_at >= ")
            .push_bind(start)
            .push(" AND occurred_at < ")
            .push_bind(end);
        let (total, blocked): (i64, i64) = qb.build_query_as().fetch_one(&self.pool).await?;
        Ok(StatusCounts { total, blocked })
    }

    async fn bucket_source_counts(
        &self,
        filter: &BaseFilter,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<GroupCount>, LensError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT COALESCE(source_id, 'unknown'), COUNT(*) FROM dns_logs WHERE TRUE",
        );
        push_base_filters(&mut qb, filter);
        qb.push(" AND occurred_at >= ")
            .push_bind(start)
            .push(" AND occurred_at < ")
            .push_bind(end)
            .push(" GROUP BY 1");
        let rows: Vec<(String, i64)> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(key, count)| GroupCount { key, count })
            .collect())
    }

    async fn distinct_sources(&self, filter: &BaseFilter) -> Result<Vec<String>, LensError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT DISTINCT COALESCE(source_id, 'unknown') FROM dns_logs WHERE TRUE",
        );
        push_base_filters(&mut qb, filter);
        qb.push(" ORDER BY 1");
        let rows: Vec<(String,)> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(source,)| source).collect())
    }

    async fn earliest_occurred_at(
        &self,
        source_id: Option<&str>,
    ) -> Result<Option<DateTime<Utc>>, LensError> {
        let earliest: (Option<DateTime<Utc>>,) = if let Some(source_id) = source_id {
            sqlx::query_as("SELECT MIN(occurred_at) FROM dns_logs WHERE source_id = $1")
                .bind(source_id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_as("SELECT MIN(occurred_at) FROM dns_logs")
                .fetch_one(&self.pool)
                .await?
        };
        Ok(earliest.0)
    }

    async fn most_recent_device(
        &self,
        filter: &BaseFilter,
    ) -> Result<Option<DeviceInfo>, LensError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT device FROM dns_logs WHERE device IS NOT NULL",
        );
        push_base_filters(&mut qb, filter);
        qb.push(" ORDER BY occurred_at DESC LIMIT 1");
        let row: Option<(String,)> = qb.build_query_as().fetch_optional(&self.pool).await?;
        Ok(row.and_then(|(device,)| parse_device(&device)))
    }

    async fn get_cursor(&self, source_id: &str) -> Result<Option<FetchCursor>, LensError> {
        let row: Option<(DateTime<Utc>, DateTime<Utc>, i64, DateTime<Utc>)> = sqlx::query_as(
            "SELECT last_record_timestamp, last_success_at, records_fetched, updated_at \
             FROM fetch_cursors WHERE source_id = $1",
        )
        .bind(source_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(
            |(last_record_timestamp, last_success_at, records_fetched, updated_at)| FetchCursor {
                source_id: source_id.to_string(),
                last_record_timestamp,
                last_success_at,
                records_fetched,
                updated_at,
            },
        ))
    }

    async fn advance_cursor(
        &self,
        source_id: &str,
        watermark: DateTime<Utc>,
        new_records: i64,
    ) -> Result<(), LensError> {
        // GREATEST keeps the watermark monotone even if two cycles race.
        sqlx::query(
            "INSERT INTO fetch_cursors (source_id, last_record_timestamp, records_fetched) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (source_id) DO UPDATE SET \
                 last_record_timestamp = \
                     GREATEST(fetch_cursors.last_record_timestamp, EXCLUDED.last_record_timestamp), \
                 last_success_at = now(), \
                 records_fetched = fetch_cursors.records_fetched + EXCLUDED.records_fetched, \
                 updated_at = now()",
        )
        .bind(source_id)
        .bind(watermark)
        .bind(new_records)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_enabled_sources(&self) -> Result<Vec<Source>, LensError> {
        let rows = sqlx::query_as::<_, (String, Option<String>, bool)>(
            "SELECT source_id, name, enabled FROM sources WHERE enabled ORDER BY source_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(source_id, name, enabled)| Source {
                source_id,
                name,
                enabled,
            })
            .collect())
    }

    async fn set_source_name(&self, source_id: &str, name: &str) -> Result<(), LensError> {
        sqlx::query("UPDATE sources SET name = $2, updated_at = now() WHERE source_id = $1")
            .bind(source_id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, LensError> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT value FROM settings WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.and_then(|(value,)| value))
    }
}
