//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::ingest::IngestionPipeline;
use crate::persistence::PgStore;
use crate::service::StatsService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Concrete store; admin endpoints need its management methods in
    /// addition to the [`LogStore`](crate::persistence::LogStore) seam.
    pub store: Arc<PgStore>,
    /// Aggregation engine for all analytics endpoints.
    pub stats: Arc<StatsService>,
    /// Ingestion pipeline, shared with the background scheduler so a
    /// manual run goes through the exact same path.
    pub pipeline: Arc<IngestionPipeline>,
}
