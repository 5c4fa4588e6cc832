//! # Braze Core
//!
//! Shared runtime plumbing for the braze connector: the upstream bot
//! context, configuration loading, logging initialization, and the error
//! types crossing the service boundary.
//!
//! The upstream protocol session itself (login, keep-alive, packet codecs)
//! lives behind [`BotContext`]; this crate exposes only the surface the
//! OneBot layer needs to broker for it.

pub mod bot;
pub mod config;
pub mod error;
pub mod logging;

pub use bot::BotContext;
pub use config::{
    BotConfig, BrazeConfig, ConfigError, ConfigLoader, LogFormat, LogLevel, LogOutput,
    LoggingConfig, load_config, load_config_from_file,
};
pub use error::ServiceError;
