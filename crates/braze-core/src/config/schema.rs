//! Configuration schema definitions.
//!
//! The root configuration deliberately knows nothing about individual
//! services: each service owns its section under `services` and deserializes
//! it on demand via [`BrazeConfig::service_section`]. This keeps the core
//! config decoupled from the OneBot layer the same way adapter configs stay
//! out of the framework core.
//!
//! # Example Configuration (YAML)
//!
//! ```yaml
//! bot:
//!   uin: 123456789
//!
//! logging:
//!   level: debug
//!   format: compact
//!
//! services:
//!   forward-ws:
//!     host: 0.0.0.0
//!     port: 8081
//!     access_token: ${BRAZE_TOKEN:-}
//!     heartbeat_interval_ms: 5000
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;

// =============================================================================
// Root Configuration
// =============================================================================

/// Root configuration structure for the braze connector.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BrazeConfig {
    /// Upstream bot identity.
    pub bot: BotConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Service-owned configuration sections, keyed by service name.
    ///
    /// Example: `services.forward-ws` holds the forward WebSocket settings.
    #[serde(default)]
    pub services: HashMap<String, serde_yaml::Value>,
}

impl BrazeConfig {
    /// Deserializes the section owned by `service`, or its `Default` when the
    /// section is absent.
    pub fn service_section<T>(&self, service: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        match self.services.get(service) {
            Some(value) => {
                serde_yaml::from_value(value.clone()).map_err(|e| ConfigError::ServiceSection {
                    service: service.to_string(),
                    message: e.to_string(),
                })
            }
            None => Ok(T::default()),
        }
    }
}

/// Upstream bot identity.
///
/// The account number normally comes out of the upstream login flow; it is
/// configured here so the OneBot surface can come up against a known
/// identity.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BotConfig {
    /// The bot's own account number.
    pub uin: i64,
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level.
    pub level: LogLevel,

    /// Output format.
    pub format: LogFormat,

    /// Output target.
    pub output: LogOutput,

    /// Module-specific log level overrides.
    ///
    /// Example: `{ "braze_onebot": "trace", "hyper": "warn" }`
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,

    /// Log file path (only used when output is "file").
    pub file_path: Option<PathBuf>,
}

/// Log level enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Converts to `tracing::Level`.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }

    /// Converts to a filter directive string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Compact single-line format.
    #[default]
    Compact,
    /// Full verbose format.
    Full,
    /// Human-readable pretty format.
    Pretty,
}

/// Log output target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Output to stdout.
    #[default]
    Stdout,
    /// Output to stderr.
    Stderr,
    /// Output to file (requires `file_path`).
    File,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Deserialize)]
    #[serde(default)]
    struct DemoSection {
        port: u16,
        label: String,
    }

    #[test]
    fn default_config_is_empty() {
        let config = BrazeConfig::default();
        assert_eq!(config.bot.uin, 0);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.services.is_empty());
    }

    #[test]
    fn service_section_deserializes_owned_type() {
        let yaml = r#"
bot:
  uin: 42
services:
  demo:
    port: 9001
    label: hello
"#;
        let config: BrazeConfig = serde_yaml::from_str(yaml).unwrap();
        let section: DemoSection = config.service_section("demo").unwrap();
        assert_eq!(section.port, 9001);
        assert_eq!(section.label, "hello");
    }

    #[test]
    fn missing_service_section_falls_back_to_default() {
        let config = BrazeConfig::default();
        let section: DemoSection = config.service_section("demo").unwrap();
        assert_eq!(section, DemoSection::default());
    }

    #[test]
    fn malformed_service_section_is_an_error() {
        let yaml = r#"
services:
  demo:
    port: not-a-number
"#;
        let config: BrazeConfig = serde_yaml::from_str(yaml).unwrap();
        let result: Result<DemoSection, _> = config.service_section("demo");
        assert!(result.is_err());
    }
}
