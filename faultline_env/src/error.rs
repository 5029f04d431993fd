//! Error types for the Faultline environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Connection refused, DNS failure, reset, etc.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request did not complete within its timeout
    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// Target URL missing or malformed
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Body or config serialization/deserialization failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Config file could not be read
    #[error("Config error: {0}")]
    ConfigError(String),
}

impl EnvError {
    /// Creates a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkError(msg.into())
    }

    /// Creates an invalid-target error.
    pub fn invalid_target(target: impl std::fmt::Display) -> Self {
        Self::InvalidTarget(target.to_string())
    }

    /// True for timeouts, which callers often report separately.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<reqwest::Error> for EnvError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(0)
        } else if err.is_builder() {
            Self::InvalidTarget(err.to_string())
        } else if err.is_decode() {
            Self::SerializationError(err.to_string())
        } else {
            Self::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for EnvError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
