//! Error types for reqlog

use thiserror::Error;

/// Errors raised while building a [`RequestLogger`](crate::RequestLogger)
///
/// All of these are startup errors: a logger is either fully configured or
/// not constructed at all.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No sink was configured
    #[error("log sink can not be empty: a request logger needs a sink to write to")]
    MissingSink,

    /// A level name did not parse
    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    /// Environment variables could not be deserialized
    #[cfg(feature = "config")]
    #[error("environment configuration error: {0}")]
    Env(#[from] envy::Error),
}

/// Result type alias for configuration operations
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;
