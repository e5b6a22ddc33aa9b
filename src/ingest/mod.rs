//! Ingestion: upstream client, dedup pipeline, and the periodic
//! scheduler that drives it.

pub mod pipeline;
pub mod scheduler;
pub mod upstream;

pub use pipeline::{CycleSummary, IngestionPipeline};
pub use scheduler::Scheduler;
pub use upstream::{UpstreamClient, UpstreamLogs};
