//! Faultline Simulation Harness
//!
//! Runs the scenario engine against a simulated target so that drills can be
//! rehearsed, and their traffic counted, without any real API.
//!
//! # Core Principle
//!
//! Everything the engine reaches outside itself is replaced:
//! - **Time**: tokio's paused clock, which jumps to the next pending timer
//!   once every task is idle
//! - **Target**: an in-memory transport with scripted replies and seeded,
//!   per-URL failure rates
//!
//! # Usage
//!
//! ```ignore
//! use faultline_sim::{run_drill, SimContext, SimTarget};
//!
//! // on a runtime built with `start_paused(true)`
//! let context = SimContext::shared();
//! let target = Arc::new(SimTarget::new(42));
//! // build a ScenarioRegistry + ScenarioControl over them, then:
//! let result = run_drill(&control, &*context, "latency", Duration::from_secs(10)).await?;
//! assert!(result.passed);
//! ```

pub mod context;
pub mod drill;
pub mod target;

pub use context::SimContext;
pub use drill::{run_drill, DrillResult};
pub use target::{RecordedRequest, SimTarget};
