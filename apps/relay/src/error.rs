//! Relay error types

use resonance_shared_config::ConfigError;
use thiserror::Error;

/// Errors raised while starting or running the relay
#[derive(Error, Debug)]
pub enum RelayError {
    /// The listener could not be bound
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Socket I/O error outside of binding
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for relay operations
pub type RelayResult<T> = Result<T, RelayError>;
