//! Error types for the scenario engine boundary.

use faultline_env::EnvError;
use thiserror::Error;

/// Errors returned across the engine/route-layer boundary.
///
/// Runner failures never show up here; they are absorbed and logged.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("Error injection API not configured")]
    NotConfigured,

    #[error("Injection API rejected {action}: HTTP {status}: {details}")]
    InjectionRejected {
        action: String,
        status: u16,
        details: String,
    },

    #[error(transparent)]
    Env(#[from] EnvError),
}

impl EngineError {
    /// Creates an unknown-scenario error.
    pub fn unknown(key: impl Into<String>) -> Self {
        Self::UnknownScenario(key.into())
    }
}
