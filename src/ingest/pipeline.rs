//! Ingestion pipeline: cursor-driven incremental fetch with
//! identity-key deduplication.
//!
//! Per enabled source each cycle: read cursor → build window → fetch →
//! normalize + dedup-insert → advance cursor. Sources are isolated —
//! one account's outage never blocks the others — and the whole cycle
//! is idempotent: re-fetching a window the store has already absorbed
//! produces only duplicates and leaves the cursor untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::upstream::UpstreamLogs;
use crate::domain::NewLogRecord;
use crate::error::LensError;
use crate::persistence::LogStore;

/// Settings key for the upstream API key.
pub const SETTING_API_KEY: &str = "api_key";
/// Settings key for the upstream page size.
pub const SETTING_FETCH_LIMIT: &str = "fetch_limit";
/// Settings key for minutes between scheduled cycles.
pub const SETTING_FETCH_INTERVAL: &str = "fetch_interval_minutes";

/// Window requested when a source has no cursor yet.
const BOOTSTRAP_WINDOW: &str = "-1h";
/// Page size used when the setting is absent or unparseable.
const DEFAULT_FETCH_LIMIT: i64 = 1000;

/// Aggregated result of one ingestion cycle across all sources.
///
/// Observability data, not control flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Records stored for the first time.
    pub new_records: u64,
    /// Records rejected by the identity key — the expected common case.
    pub duplicates: u64,
    /// Sources that completed their fetch.
    pub sources_succeeded: u32,
    /// Sources that failed this cycle (cursor left untouched).
    pub sources_failed: u32,
}

/// Per-source outcome of one cycle.
#[derive(Debug, Clone, Copy, Default)]
struct SourceOutcome {
    new_records: u64,
    duplicates: u64,
    max_new_timestamp: Option<DateTime<Utc>>,
}

/// Orchestrates one fetch-normalize-dedup-advance pass per source.
pub struct IngestionPipeline {
    store: Arc<dyn LogStore>,
    upstream: Arc<dyn UpstreamLogs>,
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline").finish_non_exhaustive()
    }
}

impl IngestionPipeline {
    /// Creates a pipeline over the given store and upstream client.
    #[must_use]
    pub fn new(store: Arc<dyn LogStore>, upstream: Arc<dyn UpstreamLogs>) -> Self {
        Self { store, upstream }
    }

    /// Runs one full ingestion cycle over all enabled sources.
    ///
    /// Configuration (API key, page size, source list) is read fresh
    /// from the store so operational changes apply without restart.
    /// With no API key configured the cycle is skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`LensError::Store`] only when the cycle cannot start at
    /// all (settings or source list unreadable). Per-source failures
    /// are counted in the summary, never propagated.
    pub async fn run_cycle(&self) -> Result<CycleSummary, LensError> {
        let Some(api_key) = self.store.get_setting(SETTING_API_KEY).await? else {
            warn!("no upstream API key configured; skipping ingestion cycle");
            return Ok(CycleSummary::default());
        };
        let fetch_limit = self
            .store
            .get_setting(SETTING_FETCH_LIMIT)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_FETCH_LIMIT);

        let sources = self.store.list_enabled_sources().await?;
        let mut summary = CycleSummary::default();

        for source in &sources {
            match self
                .ingest_source(&api_key, &source.source_id, fetch_limit)
                .await
            {
                Ok(outcome) => {
                    summary.new_records += outcome.new_records;
                    summary.duplicates += outcome.duplicates;
                    summary.sources_succeeded += 1;
                }
                Err(e) => {
                    warn!(source_id = %source.source_id, error = %e, "source failed this cycle");
                    summary.sources_failed += 1;
                }
            }
        }

        info!(
            new = summary.new_records,
            duplicates = summary.duplicates,
            succeeded = summary.sources_succeeded,
            failed = summary.sources_failed,
            "ingestion cycle finished"
        );
        Ok(summary)
    }

    /// Runs the cycle for one source: the cursor advances only when at
    /// least one new record was stored, so an empty or erroring
    /// response can never collapse the next window to "now".
    async fn ingest_source(
        &self,
        api_key: &str,
        source_id: &str,
        fetch_limit: i64,
    ) -> Result<SourceOutcome, LensError> {
        let cursor = self.store.get_cursor(source_id).await?;
        // A small overlap with the previous window is intentional: the
        // identity key absorbs refetched records.
        let from = cursor.as_ref().map_or_else(
            || BOOTSTRAP_WINDOW.to_string(),
            |c| c.last_record_timestamp.to_rfc3339(),
        );

        // First cycle for this source: pick up its display name while
        // we are here. Failures are cosmetic, never fatal.
        if cursor.is_none() {
            match self.upstream.fetch_source_name(api_key, source_id).await {
                Ok(Some(name)) => self.store.set_source_name(source_id, &name).await?,
                Ok(None) => {}
                Err(e) => debug!(source_id, error = %e, "could not fetch source name"),
            }
        }

        let events = self
            .upstream
            .fetch_logs(api_key, source_id, &from, fetch_limit)
            .await?;
        debug!(source_id, fetched = events.len(), %from, "fetched upstream page");

        let now = Utc::now();
        let mut outcome = SourceOutcome::default();
        for event in &events {
            let Some(record) = NewLogRecord::from_upstream(event, source_id, now) else {
                warn!(source_id, "skipping malformed upstream event");
                continue;
            };
            match self.store.insert_if_new(&record).await {
                Ok(inserted) if inserted.is_new => {
                    outcome.new_records += 1;
                    outcome.max_new_timestamp = Some(
                        outcome
                            .max_new_timestamp
                            .map_or(record.occurred_at, |t| t.max(record.occurred_at)),
                    );
                }
                Ok(_) => outcome.duplicates += 1,
                // One bad record must not lose the rest of the page.
                Err(e) => warn!(source_id, error = %e, "failed to store record"),
            }
        }

        if let Some(watermark) = outcome.max_new_timestamp {
            self.store
                .advance_cursor(
                    source_id,
                    watermark,
                    i64::try_from(outcome.new_records).unwrap_or(i64::MAX),
                )
                .await?;
        }

        debug!(
            source_id,
            new = outcome.new_records,
            duplicates = outcome.duplicates,
            "source ingested"
        );
        Ok(outcome)
    }
}
