//! ScenarioRunner - the per-scenario background traffic loop.
//!
//! # Cycle
//!
//! ```text
//!   ┌──────────────► cancelled? ── yes ──► Stopped (Cancelled)
//!   │                    │ no
//!   │              budget spent? ── yes ──► Stopped (BudgetExhausted)
//!   │                    │ no
//!   │          read TargetConfig (live)
//!   │                    │
//!   │        burst kind? ── yes ──► BurstExecutor ──┐
//!   │                    │ no                       │
//!   │              RequestSender ◄──────────────────┘
//!   │                    │
//!   └──── sleep(cadence) or wake on cancellation
//! ```
//!
//! Cancellation is only observed at cycle boundaries, so a runner may finish
//! the request or burst already in flight when `stop` is called.

use crate::burst::BurstExecutor;
use crate::scenario::ScenarioDefinition;
use crate::sender::RequestSender;
use faultline_env::{ConfigSource, DrillContext, TargetTransport};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// Lifecycle state of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunnerState {
    Running,
    Stopped,
}

/// Whether a runner is generating fault traffic or post-recovery traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerMode {
    /// Unbounded traffic while a fault is active
    Injecting,

    /// Bounded traffic after the fault is cleared
    Recovering,
}

/// Why a runner reached `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Cancelled,
    BudgetExhausted,
}

/// Summary produced when a runner stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunnerReport {
    /// Scenario key
    pub key: String,

    /// Generation of this runner
    pub run_id: Uuid,

    /// Mode it ran in
    pub mode: RunnerMode,

    /// Counted requests (bursts count every unit)
    pub requests_issued: u64,

    /// Requests that did not get a 2xx response
    pub requests_failed: u64,

    /// Completed cycles
    pub cycles: u64,

    /// How it stopped
    pub exit: ExitReason,
}

/// Background loop generating traffic for one scenario.
pub struct ScenarioRunner<Ctx, T, C>
where
    Ctx: DrillContext,
    T: TargetTransport,
    C: ConfigSource,
{
    definition: ScenarioDefinition,
    context: Arc<Ctx>,
    sender: RequestSender<Ctx, T>,
    burst: BurstExecutor<Ctx, T>,
    config: Arc<C>,
    cancel: CancellationToken,
    max_requests: Option<u64>,
    cadence: Duration,
    mode: RunnerMode,
    run_id: Uuid,
}

impl<Ctx, T, C> ScenarioRunner<Ctx, T, C>
where
    Ctx: DrillContext,
    T: TargetTransport,
    C: ConfigSource,
{
    /// Creates an unbounded, injecting runner.
    pub fn new(
        definition: ScenarioDefinition,
        context: Arc<Ctx>,
        sender: RequestSender<Ctx, T>,
        burst: BurstExecutor<Ctx, T>,
        config: Arc<C>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            definition,
            context,
            sender,
            burst,
            config,
            cancel,
            max_requests: None,
            cadence: Duration::from_secs(2),
            mode: RunnerMode::Injecting,
            run_id: Uuid::new_v4(),
        }
    }

    /// Caps the number of counted requests.
    pub fn with_max_requests(mut self, max_requests: Option<u64>) -> Self {
        self.max_requests = max_requests;
        self
    }

    /// Sets the pause between cycles.
    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    /// Sets the mode reported for this runner.
    pub fn with_mode(mut self, mode: RunnerMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the generation id.
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    /// Generation id of this runner.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Runs cycles until cancelled or the budget is spent.
    pub async fn run(self) -> RunnerReport {
        let key = self.definition.key.clone();
        info!(
            "Runner {} started for {} ({:?}, budget {:?})",
            self.run_id, key, self.mode, self.max_requests
        );

        let mut issued: u64 = 0;
        let mut failed: u64 = 0;
        let mut cycles: u64 = 0;

        let exit = loop {
            if self.cancel.is_cancelled() {
                break ExitReason::Cancelled;
            }
            let remaining = match self.max_requests {
                Some(max) if issued >= max => break ExitReason::BudgetExhausted,
                Some(max) => Some(max - issued),
                None => None,
            };

            let config = self.config.current();
            let shape = self.definition.request_shape;

            if self.definition.uses_burst() {
                // A budget never lets a burst overshoot it
                let units = match remaining {
                    Some(left) => self.burst.units().min(left as usize),
                    None => self.burst.units(),
                };
                let summary = self.burst.fire_units(&config, shape, units).await;
                issued += summary.dispatched as u64;
                failed += (summary.failed + summary.timed_out) as u64;
            } else {
                let outcome = self.sender.send(&config, shape).await;
                issued += 1;
                if !outcome.is_success() {
                    failed += 1;
                }
            }
            cycles += 1;
            debug!("{} cycle {}: {} requests issued", key, cycles, issued);

            if self.cancel.is_cancelled() {
                continue;
            }
            if matches!(self.max_requests, Some(max) if issued >= max) {
                continue;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = self.context.sleep(self.cadence) => {}
            }
        };

        match exit {
            ExitReason::BudgetExhausted => info!(
                "Recovery requests completed ({}/{}) for {}",
                issued,
                self.max_requests.unwrap_or_default(),
                key
            ),
            ExitReason::Cancelled => info!(
                "Runner {} for {} cancelled after {} requests",
                self.run_id, key, issued
            ),
        }

        RunnerReport {
            key,
            run_id: self.run_id,
            mode: self.mode,
            requests_issued: issued,
            requests_failed: failed,
            cycles,
            exit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioId;
    use crate::testing::MockTarget;
    use faultline_env::{SharedConfig, TargetConfig, TokioContext};

    fn runner(
        id: ScenarioId,
        target: Arc<MockTarget>,
        config: SharedConfig,
        cancel: CancellationToken,
    ) -> ScenarioRunner<TokioContext, MockTarget, SharedConfig> {
        let ctx = TokioContext::shared();
        let sender = RequestSender::new(ctx.clone(), target, Duration::from_secs(5), "test-id-1");
        let burst = BurstExecutor::new(sender.clone(), 5, Duration::from_secs(10));
        ScenarioRunner::new(id.definition(), ctx, sender, burst, Arc::new(config), cancel)
    }

    fn config() -> SharedConfig {
        SharedConfig::new(TargetConfig::new("http://inject", "http://sample"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_issues_nothing() {
        let target = Arc::new(MockTarget::new());
        let report = runner(ScenarioId::Latency, target.clone(), config(), CancellationToken::new())
            .with_max_requests(Some(0))
            .run()
            .await;

        assert_eq!(report.requests_issued, 0);
        assert_eq!(report.exit, ExitReason::BudgetExhausted);
        assert!(target.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_of_one() {
        let target = Arc::new(MockTarget::new());
        let report = runner(
            ScenarioId::WrongIds,
            target.clone(),
            config(),
            CancellationToken::new(),
        )
        .with_max_requests(Some(1))
        .run()
        .await;

        assert_eq!(report.requests_issued, 1);
        assert_eq!(report.cycles, 1);
        assert_eq!(target.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_budget_of_thirty() {
        let target = Arc::new(MockTarget::new());
        let start = tokio::time::Instant::now();
        let report = runner(
            ScenarioId::S3Access,
            target.clone(),
            config(),
            CancellationToken::new(),
        )
        .with_max_requests(Some(30))
        .with_mode(RunnerMode::Recovering)
        .run()
        .await;

        assert_eq!(report.requests_issued, 30);
        assert_eq!(target.requests().len(), 30);
        assert_eq!(report.mode, RunnerMode::Recovering);
        // 29 sleeps between 30 single-request cycles, none after the last
        assert!(start.elapsed() >= Duration::from_secs(58));
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_budget_counts_units() {
        let target = Arc::new(MockTarget::new());
        let report = runner(
            ScenarioId::LambdaThrottle,
            target.clone(),
            config(),
            CancellationToken::new(),
        )
        .with_max_requests(Some(30))
        .run()
        .await;

        assert_eq!(report.requests_issued, 30);
        assert_eq!(report.cycles, 6);
        assert_eq!(target.requests().len(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_never_overshoots_budget() {
        let target = Arc::new(MockTarget::new());
        let report = runner(
            ScenarioId::LambdaThrottle,
            target.clone(),
            config(),
            CancellationToken::new(),
        )
        .with_max_requests(Some(1))
        .run()
        .await;

        assert_eq!(report.requests_issued, 1);
        assert_eq!(target.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pre_cancelled_runner_issues_nothing() {
        let target = Arc::new(MockTarget::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = runner(ScenarioId::Latency, target.clone(), config(), cancel).run().await;

        assert_eq!(report.exit, ExitReason::Cancelled);
        assert_eq!(report.requests_issued, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_sleep_wakes_immediately() {
        let target = Arc::new(MockTarget::new());
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(
            runner(ScenarioId::Latency, target.clone(), config(), cancel.clone()).run(),
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(target.requests().len(), 1);

        let cancelled_at = tokio::time::Instant::now();
        cancel.cancel();
        let report = handle.await.unwrap();

        assert_eq!(report.exit, ExitReason::Cancelled);
        assert_eq!(report.requests_issued, 1);
        assert!(cancelled_at.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_counted_not_fatal() {
        let target = Arc::new(MockTarget::new());
        target.set_failing(true);

        let report = runner(
            ScenarioId::DynamodbThrottle,
            target,
            config(),
            CancellationToken::new(),
        )
        .with_max_requests(Some(3))
        .run()
        .await;

        assert_eq!(report.requests_issued, 3);
        assert_eq!(report.requests_failed, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_change_applies_next_cycle() {
        let target = Arc::new(MockTarget::new());
        let config = config();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(
            runner(ScenarioId::Latency, target.clone(), config.clone(), cancel.clone()).run(),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        config.update(None, Some("http://moved".to_string()));
        tokio::time::sleep(Duration::from_secs(2)).await;
        cancel.cancel();
        handle.await.unwrap();

        let urls: Vec<String> = target.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["http://sample/items", "http://moved/items"]);
    }
}
