//! Periodic driver for the ingestion pipeline.
//!
//! An explicit value owning its interval and pipeline reference rather
//! than module-level timer state. The interval is re-read from the
//! settings store at the top of every cycle, so operational changes
//! apply without a process restart.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use super::pipeline::{IngestionPipeline, SETTING_FETCH_INTERVAL};
use crate::persistence::LogStore;

/// Periodic ingestion driver.
pub struct Scheduler {
    pipeline: Arc<IngestionPipeline>,
    store: Arc<dyn LogStore>,
    default_interval_minutes: u64,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("default_interval_minutes", &self.default_interval_minutes)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Creates a scheduler with the given fallback interval.
    #[must_use]
    pub fn new(
        pipeline: Arc<IngestionPipeline>,
        store: Arc<dyn LogStore>,
        default_interval_minutes: u64,
    ) -> Self {
        Self {
            pipeline,
            store,
            default_interval_minutes,
        }
    }

    /// Runs cycles forever. Intended to be spawned as a background task.
    pub async fn run(self) {
        info!(
            default_interval_minutes = self.default_interval_minutes,
            "ingestion scheduler started"
        );
        loop {
            match self.pipeline.run_cycle().await {
                Ok(summary) => {
                    info!(
                        new = summary.new_records,
                        duplicates = summary.duplicates,
                        failed = summary.sources_failed,
                        "scheduled ingestion cycle complete"
                    );
                }
                Err(e) => error!(error = %e, "scheduled ingestion cycle failed"),
            }
            tokio::time::sleep(self.interval().await).await;
        }
    }

    /// Current interval: the settings value when present and valid,
    /// otherwise the configured default.
    async fn interval(&self) -> Duration {
        let minutes = match self.store.get_setting(SETTING_FETCH_INTERVAL).await {
            Ok(value) => value
                .and_then(|v| v.parse().ok())
                .unwrap_or(self.default_interval_minutes),
            Err(e) => {
                error!(error = %e, "could not read fetch interval; using default");
                self.default_interval_minutes
            }
        };
        Duration::from_secs(minutes.max(1) * 60)
    }
}
