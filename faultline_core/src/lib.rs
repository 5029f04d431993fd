//! Faultline Core - Scenario Execution Engine
//!
//! Keeps synthetic traffic flowing against a target API while a fault is
//! injected, so that downstream alarms observe the failure and, after
//! recovery, its resolution.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      ScenarioControl                         │
//! │   inject / recover / recover_all / status / check_connection │
//! └──────────────┬──────────────────────────────┬────────────────┘
//!                │                              │
//!     ┌──────────▼──────────┐        error-injection API (HTTP)
//!     │  ScenarioRegistry   │  one RunnerHandle per scenario key
//!     └──────────┬──────────┘
//!                │ spawn (one task per live runner)
//!     ┌──────────▼──────────┐
//!     │   ScenarioRunner    │  cycle every 2s, cancellable
//!     └────┬───────────┬────┘
//!          │           │
//!  ┌───────▼──────┐ ┌──▼────────────┐
//!  │BurstExecutor │ │ RequestSender │ ──► sample API (HTTP)
//!  └──────────────┘ └───────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use faultline_core::{EngineSettings, ScenarioCatalog, ScenarioControl, ScenarioRegistry};
//! use faultline_env::{HttpTransport, JsonFileConfig, TokioContext};
//!
//! let transport = HttpTransport::shared();
//! let registry = Arc::new(ScenarioRegistry::new(
//!     TokioContext::shared(),
//!     transport.clone(),
//!     Arc::new(JsonFileConfig::new("config.json")),
//!     ScenarioCatalog::builtin(),
//!     EngineSettings::default(),
//! ));
//! let control = ScenarioControl::new(registry, transport);
//! control.inject("latency").await?;
//! ```

pub mod burst;
pub mod control;
pub mod error;
pub mod registry;
pub mod runner;
pub mod scenario;
pub mod sender;
pub mod settings;

#[cfg(test)]
mod testing;

// Re-export key types for convenience
pub use burst::{BurstExecutor, BurstSummary};
pub use control::{ConnectionReport, InjectionAction, RecoveryOutcome, ScenarioControl};
pub use error::EngineError;
pub use registry::{RunnerHandle, RunnerStatus, ScenarioRegistry};
pub use runner::{ExitReason, RunnerMode, RunnerReport, RunnerState, ScenarioRunner};
pub use scenario::{RequestShape, ScenarioCatalog, ScenarioDefinition, ScenarioId};
pub use sender::{RequestOutcome, RequestSender};
pub use settings::EngineSettings;
