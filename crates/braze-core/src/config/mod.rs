//! Configuration module for the braze connector.
//!
//! Provides YAML-based configuration loading for the upstream bot identity,
//! logging, and service-owned sections.

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config, load_config_from_file};
pub use schema::{BotConfig, BrazeConfig, LogFormat, LogLevel, LogOutput, LoggingConfig};
