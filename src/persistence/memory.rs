//! In-memory [`LogStore`] double for tests.
//!
//! Mirrors the Postgres semantics — identity-key dedup, forward-only
//! cursor watermarks, shared exclusion predicate — without a database,
//! so pipeline and aggregation behavior can be tested hermetically.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::store::{
    BaseFilter, DeviceRow, FetchCursor, GroupCount, InsertOutcome, LogStore, RecordQuery, Source,
    StatusCounts, StatusFilter,
};
use crate::domain::{DeviceInfo, LogRecord, NewLogRecord, derive_tld, device_display_name};
use crate::error::LensError;

#[derive(Debug, Default)]
struct Inner {
    records: Vec<LogRecord>,
    cursors: HashMap<String, FetchCursor>,
    sources: Vec<Source>,
    settings: HashMap<String, String>,
    next_id: i64,
}

/// Hermetic store used by pipeline and aggregation tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds one runtime setting.
    pub fn put_setting(&self, key: &str, value: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.settings.insert(key.to_string(), value.to_string());
        }
    }

    /// Registers an enabled source.
    pub fn add_source(&self, source_id: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.sources.push(Source {
                source_id: source_id.to_string(),
                name: None,
                enabled: true,
            });
        }
    }

    /// Total stored row count.
    pub fn row_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.records.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, LensError> {
        self.inner
            .lock()
            .map_err(|_| LensError::Internal("memory store poisoned".to_string()))
    }
}

fn passes(filter: &BaseFilter, record: &LogRecord) -> bool {
    if let Some(source_id) = &filter.source_id
        && record.source_id.as_deref() != Some(source_id.as_str())
    {
        return false;
    }
    if let Some(since) = filter.since
        && record.occurred_at < since
    {
        return false;
    }
    if let Some(exclusion) = &filter.exclusion
        && exclusion.matches(&record.domain)
    {
        return false;
    }
    true
}

fn group_counts<'a, I, F>(records: I, key_fn: F, limit: i64) -> Vec<GroupCount>
where
    I: Iterator<Item = &'a LogRecord>,
    F: Fn(&LogRecord) -> Option<String>,
{
    let mut counts: HashMap<String, i64> = HashMap::new();
    for record in records {
        if let Some(key) = key_fn(record) {
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    let mut groups: Vec<GroupCount> = counts
        .into_iter()
        .map(|(key, count)| GroupCount { key, count })
        .collect();
    groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    groups.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    groups
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn insert_if_new(&self, record: &NewLogRecord) -> Result<InsertOutcome, LensError> {
        let mut inner = self.lock()?;
        let key = record.identity_key();
        if let Some(existing) = inner.records.iter().find(|r| {
            (r.occurred_at, r.domain.as_str(), r.client_address.as_deref()) == key
        }) {
            return Ok(InsertOutcome {
                id: existing.id,
                is_new: false,
            });
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.records.push(LogRecord {
            id,
            occurred_at: record.occurred_at,
            domain: record.domain.clone(),
            tld: derive_tld(&record.domain),
            action: record.action.clone(),
            blocked: record.blocked,
            device: record.device.clone(),
            client_address: record.client_address.clone(),
            query_type: record.query_type.clone(),
            source_id: Some(record.source_id.clone()),
            raw_payload: record.raw_payload.clone(),
            created_at: Utc::now(),
        });
        Ok(InsertOutcome { id, is_new: true })
    }

    async fn query_records(
        &self,
        query: &RecordQuery,
    ) -> Result<(Vec<LogRecord>, i64), LensError> {
        let inner = self.lock()?;
        let mut matching: Vec<LogRecord> = inner
            .records
            .iter()
            .filter(|r| passes(&query.base, r))
            .filter(|r| match query.status {
                StatusFilter::All => true,
                StatusFilter::Blocked => r.blocked,
                StatusFilter::Allowed => !r.blocked,
            })
            .filter(|r| {
                query.search.as_deref().is_none_or(|s| {
                    r.domain.to_lowercase().contains(&s.trim().to_lowercase())
                })
            })
            .filter(|r| {
                query.devices.is_empty()
                    || device_display_name(r.device.as_ref())
                        .is_some_and(|name| query.devices.contains(&name))
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        let matched = i64::try_from(matching.len()).unwrap_or(i64::MAX);
        let offset = usize::try_from(query.offset).unwrap_or(0);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        let page: Vec<LogRecord> = matching.into_iter().skip(offset).take(limit).collect();
        Ok((page, matched))
    }

    async fn estimated_total_count(&self) -> Result<i64, LensError> {
        let inner = self.lock()?;
        Ok(i64::try_from(inner.records.len()).unwrap_or(i64::MAX))
    }

    async fn count_by_status(&self, filter: &BaseFilter) -> Result<StatusCounts, LensError> {
        let inner = self.lock()?;
        let mut counts = StatusCounts::default();
        for record in inner.records.iter().filter(|r| passes(filter, r)) {
            counts.total += 1;
            if record.blocked {
                counts.blocked += 1;
            }
        }
        Ok(counts)
    }

    async fn top_domains(
        &self,
        filter: &BaseFilter,
        blocked: bool,
        limit: i64,
    ) -> Result<Vec<GroupCount>, LensError> {
        let inner = self.lock()?;
        Ok(group_counts(
            inner
                .records
                .iter()
                .filter(|r| passes(filter, r) && r.blocked == blocked),
            |r| Some(r.domain.clone()),
            limit,
        ))
    }

    async fn top_tlds(
        &self,
        filter: &BaseFilter,
        blocked: bool,
        limit: i64,
    ) -> Result<Vec<GroupCount>, LensError> {
        let inner = self.lock()?;
        Ok(group_counts(
            inner
                .records
                .iter()
                .filter(|r| passes(filter, r) && r.blocked == blocked),
            |r| r.tld.clone(),
            limit,
        ))
    }

    async fn device_rows(&self, filter: &BaseFilter) -> Result<Vec<DeviceRow>, LensError> {
        let inner = self.lock()?;
        Ok(inner
            .records
            .iter()
            .filter(|r| passes(filter, r))
            .map(|r| DeviceRow {
                device: r.device.clone(),
                blocked: r.blocked,
                occurred_at: r.occurred_at,
            })
            .collect())
    }

    async fn bucket_status_counts(
        &self,
        filter: &BaseFilter,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<StatusCounts, LensError> {
        let inner = self.lock()?;
        let mut counts = StatusCounts::default();
        for record in inner
            .records
            .iter()
            .filter(|r| passes(filter, r) && r.occurred_at >= start && r.occurred_at < end)
        {
            counts.total += 1;
            if record.blocked {
                counts.blocked += 1;
            }
        }
        Ok(counts)
    }

    async fn bucket_source_counts(
        &self,
        filter: &BaseFilter,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<GroupCount>, LensError> {
        let inner = self.lock()?;
        Ok(group_counts(
            inner
                .records
                .iter()
                .filter(|r| passes(filter, r) && r.occurred_at >= start && r.occurred_at < end),
            |r| {
                Some(
                    r.source_id
                        .clone()
                        .unwrap_or_else(|| "unknown".to_string()),
                )
            },
            i64::MAX,
        ))
    }

    async fn distinct_sources(&self, filter: &BaseFilter) -> Result<Vec<String>, LensError> {
        let inner = self.lock()?;
        let mut sources: Vec<String> = inner
            .records
            .iter()
            .filter(|r| passes(filter, r))
            .map(|r| {
                r.source_id
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string())
            })
            .collect();
        sources.sort();
        sources.dedup();
        Ok(sources)
    }

    async fn earliest_occurred_at(
        &self,
        source_id: Option<&str>,
    ) -> Result<Option<DateTime<Utc>>, LensError> {
        let inner = self.lock()?;
        Ok(inner
            .records
            .iter()
            .filter(|r| source_id.is_none_or(|s| r.source_id.as_deref() == Some(s)))
            .map(|r| r.occurred_at)
            .min())
    }

    async fn most_recent_device(
        &self,
        filter: &BaseFilter,
    ) -> Result<Option<DeviceInfo>, LensError> {
        let inner = self.lock()?;
        Ok(inner
            .records
            .iter()
            .filter(|r| passes(filter, r) && r.device.is_some())
            .max_by_key(|r| r.occurred_at)
            .and_then(|r| r.device.clone()))
    }

    async fn get_cursor(&self, source_id: &str) -> Result<Option<FetchCursor>, LensError> {
        let inner = self.lock()?;
        Ok(inner.cursors.get(source_id).cloned())
    }

    async fn advance_cursor(
        &self,
        source_id: &str,
        watermark: DateTime<Utc>,
        new_records: i64,
    ) -> Result<(), LensError> {
        let mut inner = self.lock()?;
        let now = Utc::now();
        inner
            .cursors
            .entry(source_id.to_string())
            .and_modify(|cursor| {
                cursor.last_record_timestamp = cursor.last_record_timestamp.max(watermark);
                cursor.last_success_at = now;
                cursor.records_fetched += new_records;
                cursor.updated_at = now;
            })
            .or_insert(FetchCursor {
                source_id: source_id.to_string(),
                last_record_timestamp: watermark,
                last_success_at: now,
                records_fetched: new_records,
                updated_at: now,
            });
        Ok(())
    }

    async fn list_enabled_sources(&self) -> Result<Vec<Source>, LensError> {
        let inner = self.lock()?;
        Ok(inner.sources.iter().filter(|s| s.enabled).cloned().collect())
    }

    async fn set_source_name(&self, source_id: &str, name: &str) -> Result<(), LensError> {
        let mut inner = self.lock()?;
        if let Some(source) = inner.sources.iter_mut().find(|s| s.source_id == source_id) {
            source.name = Some(name.to_string());
        }
        Ok(())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, LensError> {
        let inner = self.lock()?;
        Ok(inner.settings.get(key).cloned())
    }
}
