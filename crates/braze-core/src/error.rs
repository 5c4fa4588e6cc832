//! Service-level error types.

use thiserror::Error;

/// Errors surfaced by long-running connector services.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Failed to bind the listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The service was started twice without an intervening stop.
    #[error("service is already running")]
    AlreadyStarted,

    /// A configuration value outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
