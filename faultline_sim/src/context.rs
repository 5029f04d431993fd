//! Simulation context implementing DrillContext on tokio's clock.

use async_trait::async_trait;
use faultline_env::DrillContext;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

/// Simulation context for a paused tokio runtime.
///
/// Time is read from `tokio::time::Instant` and `sleep` is a tokio sleep,
/// so on a paused current-thread runtime the clock jumps straight to the
/// earliest pending deadline once every task is idle. Concurrent sleepers
/// share one timeline: a runner with a 2s cadence and a 20s hold sleeping
/// side by side see the same 20s. On an unpaused runtime it runs in real
/// time.
#[derive(Debug, Clone)]
pub struct SimContext {
    /// Instant that maps to virtual time 0
    start: Instant,

    /// Epoch offset (virtual time 0 maps to this wall-clock time)
    epoch: SystemTime,
}

impl SimContext {
    /// Creates a context whose clock starts now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            epoch: UNIX_EPOCH + Duration::from_secs(1704067200), // 2024-01-01 00:00:00 UTC
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for SimContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DrillContext for SimContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        self.epoch + self.now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn spawn<F>(&self, name: &str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        tracing::debug!("sim spawn: {}", name);
        tokio::spawn(future);
    }
}
