//! Meta events emitted by the connector.
//!
//! # Hierarchy
//!
//! ```text
//! meta_event
//! ├── lifecycle { sub_type: "connect" }
//! └── heartbeat { status, interval }
//! ```

use serde::{Deserialize, Serialize};

use super::unix_now;

/// Health snapshot carried by heartbeats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BotStatus {
    /// Whether the upstream session is established.
    pub online: bool,
    /// Whether the bot is in a usable state.
    pub good: bool,
}

impl BotStatus {
    /// Builds a snapshot from the online flag; a bot is "good" exactly when
    /// it is online.
    pub fn new(online: bool) -> Self {
        Self {
            online,
            good: online,
        }
    }
}

/// Lifecycle meta event (`meta_event_type = "lifecycle"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleMeta {
    pub time: i64,
    pub self_id: i64,
    pub post_type: String,
    pub meta_event_type: String,
    /// Sub-type ("enable", "disable", "connect").
    pub sub_type: String,
}

impl LifecycleMeta {
    /// The one-shot "I am online" event sent before the first heartbeat.
    pub fn connect(self_id: i64) -> Self {
        Self {
            time: unix_now(),
            self_id,
            post_type: "meta_event".to_string(),
            meta_event_type: "lifecycle".to_string(),
            sub_type: "connect".to_string(),
        }
    }
}

/// Heartbeat meta event (`meta_event_type = "heartbeat"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatMeta {
    pub time: i64,
    pub self_id: i64,
    pub post_type: String,
    pub meta_event_type: String,
    pub status: BotStatus,
    /// Heartbeat period in milliseconds.
    pub interval: i64,
}

impl HeartbeatMeta {
    pub fn new(self_id: i64, status: BotStatus, interval: i64) -> Self {
        Self {
            time: unix_now(),
            self_id,
            post_type: "meta_event".to_string(),
            meta_event_type: "heartbeat".to_string(),
            status,
            interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_connect_shape() {
        let event = LifecycleMeta::connect(123456789);
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["self_id"], 123456789);
        assert_eq!(value["post_type"], "meta_event");
        assert_eq!(value["meta_event_type"], "lifecycle");
        assert_eq!(value["sub_type"], "connect");
        assert!(value["time"].as_i64().unwrap() > 0);
    }

    #[test]
    fn heartbeat_shape() {
        let event = HeartbeatMeta::new(123456789, BotStatus::new(true), 5000);
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["meta_event_type"], "heartbeat");
        assert_eq!(value["interval"], 5000);
        assert_eq!(value["status"]["online"], true);
        assert_eq!(value["status"]["good"], true);
    }

    #[test]
    fn heartbeat_round_trips() {
        let event = HeartbeatMeta::new(7, BotStatus::new(false), 100);
        let json = serde_json::to_string(&event).unwrap();
        let back: HeartbeatMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(back.self_id, 7);
        assert!(!back.status.online);
        assert!(!back.status.good);
    }
}
