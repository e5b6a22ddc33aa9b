//! Aggregation services built on top of the log store.

pub mod stats;

pub use stats::{
    DeviceUsage, RankedEntry, SeriesGrouping, SourceBucket, SourceCount, StatsOverview,
    StatsService, StatusBucket, TimeSeries, TopGroups, UNIDENTIFIED_DEVICE,
};
