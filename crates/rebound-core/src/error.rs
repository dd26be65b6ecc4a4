//! Error types for rebound-core

use thiserror::Error;

/// Result type alias using rebound-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration and loading errors
///
/// Failures of retried operations are never represented here; the
/// coordinator keeps them opaque.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No policy configured for the requested call site
    #[error("No retry policy configured for operation: {operation}")]
    UnknownPolicy { operation: String },
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an unknown policy error
    pub fn unknown_policy(operation: impl Into<String>) -> Self {
        Self::UnknownPolicy {
            operation: operation.into(),
        }
    }
}
