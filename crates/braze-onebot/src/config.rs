//! Configuration for the forward WebSocket service.
//!
//! The service owns the `forward-ws` section of the root configuration:
//!
//! ```yaml
//! services:
//!   forward-ws:
//!     host: 0.0.0.0
//!     port: 8081
//!     access_token: ${BRAZE_TOKEN:-}
//!     heartbeat_interval_ms: 5000
//! ```

use serde::{Deserialize, Serialize};

/// Forward WebSocket service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// Bind address (default: "0.0.0.0").
    pub host: String,

    /// Listen port (default: 8081).
    pub port: u16,

    /// Shared secret required from connecting clients.
    ///
    /// `None` or an empty string allows every client.
    pub access_token: Option<String>,

    /// Heartbeat period in milliseconds for non-`api` sessions.
    pub heartbeat_interval_ms: u64,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            access_token: None,
            heartbeat_interval_ms: 5000,
        }
    }
}

impl ForwardConfig {
    /// Name of this service's section in the root configuration.
    pub const SECTION: &'static str = "forward-ws";

    /// Returns the bind address string.
    ///
    /// `"0.0.0.0"` already names the wildcard interface for a TCP bind, so no
    /// remapping is needed; this is the single place the address is formed.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ForwardConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8081");
        assert_eq!(config.heartbeat_interval_ms, 5000);
        assert!(config.access_token.is_none());
    }

    #[test]
    fn deserialize_partial_yaml() {
        let yaml = r#"
port: 9090
access_token: secret
"#;
        let config: ForwardConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9090);
        assert_eq!(config.access_token.as_deref(), Some("secret"));
        assert_eq!(config.heartbeat_interval_ms, 5000);
    }
}
