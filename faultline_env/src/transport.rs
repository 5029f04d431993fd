//! Target transport abstraction for Faultline runners.

use crate::error::EnvError;
use crate::types::{TargetRequest, TargetResponse};
use async_trait::async_trait;

/// Abstraction for outbound HTTP between the engine and the APIs it drives.
///
/// # Implementations
///
/// - **Production**: `HttpTransport` - wraps a shared `reqwest::Client`
/// - **Simulation**: `SimTarget` - records requests, injects failures/latency
///
/// # Request Flow
///
/// ```text
/// Runner                  Transport                 Sample API
///   |                        |                          |
///   |-- send(request) ------>|                          |
///   |                        |-- [timeout bounded] ---->|
///   |<- Ok(response) / Err --|<-------------------------|
/// ```
#[async_trait]
pub trait TargetTransport: Send + Sync + 'static {
    /// Performs exactly one request and waits for its response.
    ///
    /// # Returns
    /// * `Ok(response)` - Any HTTP response, including 4xx/5xx
    /// * `Err(EnvError::Timeout)` - No response within `request.timeout`
    /// * `Err(EnvError::NetworkError)` - Connection could not be made
    async fn send(&self, request: TargetRequest) -> Result<TargetResponse, EnvError>;
}
