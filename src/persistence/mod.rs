//! Persistence layer: the log store contract and its PostgreSQL
//! implementation.
//!
//! Provides the [`LogStore`] trait for insert-with-dedup, filtered
//! queries, aggregation support, fetch cursors, sources, and settings.
//! The concrete implementation uses `sqlx::PgPool` for async
//! PostgreSQL access.

#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod store;

pub use postgres::PgStore;
pub use store::{
    BaseFilter, DeviceRow, FetchCursor, GroupCount, InsertOutcome, LogStore, RecordQuery, Source,
    StatusCounts, StatusFilter,
};
