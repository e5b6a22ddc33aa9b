//! Core domain types: log records, identity keys, TLD derivation,
//! exclusion filters, and time-range resolution.

pub mod exclusion;
pub mod record;
pub mod time_range;
pub mod tld;

pub use exclusion::DomainExclusion;
pub use record::{DeviceInfo, LogRecord, NewLogRecord, device_display_name};
pub use time_range::{Granularity, RangeToken, ResolvedRange, resolve};
pub use tld::derive_tld;
