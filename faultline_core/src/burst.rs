//! BurstExecutor - concurrent request batches for throttling scenarios.

use crate::scenario::RequestShape;
use crate::sender::RequestSender;
use faultline_env::{DrillContext, TargetConfig, TargetTransport};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// What happened to one burst.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurstSummary {
    /// Units launched (counted whether or not they succeeded)
    pub dispatched: usize,

    /// Units that got a non-2xx response or no response
    pub failed: usize,

    /// Units abandoned after the per-unit timeout
    pub timed_out: usize,
}

/// Fires a fixed-size batch of simultaneous requests and joins it.
pub struct BurstExecutor<Ctx, T>
where
    Ctx: DrillContext,
    T: TargetTransport,
{
    sender: RequestSender<Ctx, T>,
    units: usize,
    unit_timeout: Duration,
}

impl<Ctx, T> Clone for BurstExecutor<Ctx, T>
where
    Ctx: DrillContext,
    T: TargetTransport,
{
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            units: self.units,
            unit_timeout: self.unit_timeout,
        }
    }
}

impl<Ctx, T> BurstExecutor<Ctx, T>
where
    Ctx: DrillContext,
    T: TargetTransport,
{
    /// Creates an executor firing `units` requests per burst.
    pub fn new(sender: RequestSender<Ctx, T>, units: usize, unit_timeout: Duration) -> Self {
        Self {
            sender,
            units,
            unit_timeout,
        }
    }

    /// Configured burst size.
    pub fn units(&self) -> usize {
        self.units
    }

    /// Fires a full burst.
    pub async fn fire(&self, config: &TargetConfig, shape: RequestShape) -> BurstSummary {
        self.fire_units(config, shape, self.units).await
    }

    /// Fires `units` concurrent requests, each in its own task, and waits
    /// until every unit has finished or hit the per-unit timeout.
    pub async fn fire_units(
        &self,
        config: &TargetConfig,
        shape: RequestShape,
        units: usize,
    ) -> BurstSummary {
        let mut set = JoinSet::new();
        for _ in 0..units {
            let sender = self.sender.clone();
            let config = config.clone();
            let unit_timeout = self.unit_timeout;
            set.spawn(async move {
                tokio::time::timeout(unit_timeout, async move { sender.send(&config, shape).await })
                    .await
            });
        }

        let mut summary = BurstSummary {
            dispatched: units,
            ..BurstSummary::default()
        };
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(outcome)) if outcome.is_success() => {}
                Ok(Ok(_)) => summary.failed += 1,
                Ok(Err(_elapsed)) => summary.timed_out += 1,
                Err(e) => {
                    warn!("Burst unit panicked: {}", e);
                    summary.failed += 1;
                }
            }
        }

        debug!(
            "Burst done: {} dispatched, {} failed, {} timed out",
            summary.dispatched, summary.failed, summary.timed_out
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTarget;
    use faultline_env::TokioContext;
    use std::sync::Arc;

    fn executor(
        target: Arc<MockTarget>,
        unit_timeout: Duration,
    ) -> BurstExecutor<TokioContext, MockTarget> {
        let sender = RequestSender::new(
            TokioContext::shared(),
            target,
            Duration::from_secs(5),
            "test-id-1",
        );
        BurstExecutor::new(sender, 5, unit_timeout)
    }

    fn config() -> TargetConfig {
        TargetConfig::new("http://inject", "http://sample")
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_runs_units_concurrently() {
        let target = Arc::new(MockTarget::new());
        target.set_latency(Duration::from_millis(500));

        let summary = executor(target.clone(), Duration::from_secs(10))
            .fire(&config(), RequestShape::Write)
            .await;

        assert_eq!(summary.dispatched, 5);
        assert_eq!(summary.failed, 0);
        assert_eq!(target.requests().len(), 5);
        assert_eq!(target.max_in_flight(), 5);
    }

    #[tokio::test]
    async fn test_failed_units_still_count_as_dispatched() {
        let target = Arc::new(MockTarget::new());
        target.set_failing(true);

        let summary = executor(target.clone(), Duration::from_secs(10))
            .fire(&config(), RequestShape::Write)
            .await;

        assert_eq!(summary.dispatched, 5);
        assert_eq!(summary.failed, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_units_are_bounded_by_unit_timeout() {
        let target = Arc::new(MockTarget::new());
        target.set_latency(Duration::from_secs(60));

        let start = tokio::time::Instant::now();
        let summary = executor(target, Duration::from_secs(10))
            .fire(&config(), RequestShape::Write)
            .await;

        assert_eq!(summary.dispatched, 5);
        assert_eq!(summary.timed_out, 5);
        assert!(start.elapsed() < Duration::from_secs(11));
    }

    #[tokio::test]
    async fn test_partial_burst() {
        let target = Arc::new(MockTarget::new());
        let summary = executor(target.clone(), Duration::from_secs(10))
            .fire_units(&config(), RequestShape::Write, 2)
            .await;

        assert_eq!(summary.dispatched, 2);
        assert_eq!(target.requests().len(), 2);
    }
}
