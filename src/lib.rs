//! # dnslens
//!
//! DNS query log ingestion and rollup analytics service.
//!
//! Periodically pulls query logs from upstream DNS filtering profiles,
//! stores them with identity-key deduplication, and serves analytics
//! (overview counters, top domains/TLDs, device usage, bucketed time
//! series) over a REST API.
//!
//! ## Architecture
//!
//! ```text
//! Upstream log API (X-Api-Key)
//!     │
//!     ├── UpstreamClient (ingest/)
//!     ├── IngestionPipeline + Scheduler (ingest/)
//!     │
//!     ├── LogStore seam (persistence/)
//!     │       └── PostgreSQL (PgStore)
//!     │
//!     ├── StatsService (service/)
//!     │
//!     └── REST Handlers (api/)
//! ```
//!
//! Normalization, TLD derivation, exclusion-filter compilation, and
//! time-range resolution live in `domain/` as pure functions, shared by
//! the SQL and in-memory filter paths.

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod persistence;
pub mod service;
