//! Faultline Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" seam that lets the scenario engine run
//! against **Production** (tokio + reqwest) or **Simulation** (virtual clock +
//! recorded target) environments.
//!
//! # Core Concept
//!
//! Everything the engine touches outside its own state is intercepted:
//! - Time (`now()`, `system_time()`, `sleep()`)
//! - Task spawning (`spawn()`)
//! - Outbound HTTP (`TargetTransport::send()`)
//! - Live target configuration (`ConfigSource::current()`)
//!
//! # Example
//!
//! ```ignore
//! use faultline_env::{DrillContext, TargetTransport, TargetRequest};
//!
//! async fn cycle<Ctx: DrillContext, T: TargetTransport>(ctx: &Ctx, target: &T) {
//!     loop {
//!         let _ = target.send(TargetRequest::get("http://api/items")).await;
//!         ctx.sleep(Duration::from_secs(2)).await;
//!     }
//! }
//! ```

mod config;
mod context;
mod error;
mod http_impl;
mod tokio_impl;
mod transport;
mod types;

pub use config::{ConfigSource, JsonFileConfig, LayeredConfig, SharedConfig};
pub use context::DrillContext;
pub use error::EnvError;
pub use http_impl::HttpTransport;
pub use tokio_impl::TokioContext;
pub use transport::TargetTransport;
pub use types::{HttpMethod, TargetConfig, TargetRequest, TargetResponse};
