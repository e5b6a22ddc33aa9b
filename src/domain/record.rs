//! DNS log records: stored rows, pre-insert records, and upstream
//! event normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Structured device blob attached to a log event by the upstream.
///
/// Persisted as serialized text at the storage edge and parsed once on
/// read; everything in between works with this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeviceInfo {
    /// Opaque upstream device identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Human-readable device name.
    #[serde(default)]
    pub name: Option<String>,
}

/// One stored DNS query event.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LogRecord {
    /// Surrogate key assigned by the store.
    pub id: i64,
    /// Event timestamp, the primary ordering axis.
    pub occurred_at: DateTime<Utc>,
    /// Queried name.
    pub domain: String,
    /// Derived top-level label, computed at ingest time.
    pub tld: Option<String>,
    /// Raw disposition string from the upstream (`allowed`, `blocked`, ...).
    pub action: String,
    /// Canonical filter field, derived from `action` and explicit flags.
    pub blocked: bool,
    /// Device blob, parsed once on read.
    pub device: Option<DeviceInfo>,
    /// Client IP (v4/v6) when reported.
    pub client_address: Option<String>,
    /// DNS record type.
    pub query_type: String,
    /// Upstream account that produced the record.
    pub source_id: Option<String>,
    /// Full original event, retained for forward-compatible re-derivation.
    pub raw_payload: serde_json::Value,
    /// Storage insert time.
    pub created_at: DateTime<Utc>,
}

/// A normalized log event ready for [`insert_if_new`].
///
/// [`insert_if_new`]: crate::persistence::LogStore::insert_if_new
#[derive(Debug, Clone)]
pub struct NewLogRecord {
    /// Event timestamp.
    pub occurred_at: DateTime<Utc>,
    /// Queried name.
    pub domain: String,
    /// Raw disposition string.
    pub action: String,
    /// Derived blocked flag.
    pub blocked: bool,
    /// Device blob, if the upstream reported one.
    pub device: Option<DeviceInfo>,
    /// Client IP when reported.
    pub client_address: Option<String>,
    /// DNS record type, defaulting to `A`.
    pub query_type: String,
    /// Source that reported the event.
    pub source_id: String,
    /// Full original event.
    pub raw_payload: serde_json::Value,
}

impl NewLogRecord {
    /// Normalizes one raw upstream event.
    ///
    /// Returns `None` when the event carries no usable domain; callers
    /// skip such records rather than failing the batch. A missing or
    /// unparseable timestamp falls back to `now`.
    #[must_use]
    pub fn from_upstream(event: &serde_json::Value, source_id: &str, now: DateTime<Utc>) -> Option<Self> {
        let domain = event
            .get("domain")
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|d| !d.is_empty())?
            .to_string();

        let occurred_at = event
            .get("timestamp")
            .and_then(serde_json::Value::as_str)
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map_or(now, |ts| ts.with_timezone(&Utc));

        let status = event.get("status").and_then(serde_json::Value::as_str);
        let action = event
            .get("action")
            .and_then(serde_json::Value::as_str)
            .or(status)
            .unwrap_or("default")
            .to_string();

        let blocked = event
            .get("blocked")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
            || action == "blocked"
            || status == Some("blocked");

        let device = event
            .get("device")
            .filter(|v| v.is_object())
            .and_then(|v| serde_json::from_value(v.clone()).ok());

        let client_address = event
            .get("clientIp")
            .or_else(|| event.get("client_ip"))
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string);

        let query_type = event
            .get("queryType")
            .or_else(|| event.get("query_type"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or("A")
            .to_string();

        Some(Self {
            occurred_at,
            domain,
            action,
            blocked,
            device,
            client_address,
            query_type,
            source_id: source_id.to_string(),
            raw_payload: event.clone(),
        })
    }

    /// The dedup identity key: a physical DNS query is the same event
    /// regardless of which source reported it, so the key carries no
    /// source field.
    #[must_use]
    pub fn identity_key(&self) -> (DateTime<Utc>, &str, Option<&str>) {
        (
            self.occurred_at,
            self.domain.as_str(),
            self.client_address.as_deref(),
        )
    }
}

/// Extracts a display name from an optional device blob.
///
/// Returns `None` when the blob is absent or carries no name; callers
/// substitute their own sentinel.
#[must_use]
pub fn device_display_name(device: Option<&DeviceInfo>) -> Option<String> {
    device
        .and_then(|d| d.name.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(ToString::to_string)
}
