//! Data models for the OneBot v11 wire format.
//!
//! Field names are the OneBot v11 literals; the connector emits these types
//! as single JSON text frames.

pub mod api;
pub mod meta;

pub use api::{ApiResponse, RETCODE_UNSUPPORTED_ACTION};
pub use meta::{BotStatus, HeartbeatMeta, LifecycleMeta};

/// Current time as a unix timestamp in seconds, as stamped into event
/// payloads.
pub(crate) fn unix_now() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
