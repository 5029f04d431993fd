//! ScenarioRegistry - one consistent table of runner handles.
//!
//! The table has one slot per catalog key, created up front, so the map
//! itself is never mutated after construction. Each slot is an async mutex:
//! `start`, `stop` and `status` on the same key serialize on it, while
//! different keys never contend.
//!
//! # Replacement protocol
//!
//! ```text
//! start(key)
//!   lock slot(key)
//!   ├─ old handle? ── cancel ── wait ≤ grace for Stopped
//!   ├─ new CancellationToken + RunnerHandle
//!   ├─ spawn ScenarioRunner
//!   └─ store handle, unlock
//! ```
//!
//! Retirement is best effort: if the old runner is still finishing a burst
//! when the grace period ends, the new runner starts anyway and the old one
//! exits at its next cycle boundary.
//!
//! The slot stays locked while `start` retires, so a `stop` or `status` on
//! that key issued meanwhile waits up to `retire_grace`. `stop` never waits
//! on a runner itself, only on the slot, and a `stop` queued behind a
//! replacement lands on the new runner instead of being lost.

use crate::burst::BurstExecutor;
use crate::error::EngineError;
use crate::runner::{RunnerMode, RunnerReport, RunnerState, ScenarioRunner};
use crate::scenario::{ScenarioCatalog, ScenarioDefinition};
use crate::sender::RequestSender;
use crate::settings::EngineSettings;
use faultline_env::{ConfigSource, DrillContext, TargetTransport};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Liveness and mode of a scenario's current runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunnerStatus {
    pub is_live: bool,
    pub is_recovering: bool,
}

/// The registry's record of one runner.
#[derive(Debug, Clone)]
pub struct RunnerHandle {
    key: String,
    run_id: Uuid,
    mode: RunnerMode,
    max_requests: Option<u64>,
    cancel: CancellationToken,
    state: watch::Receiver<RunnerState>,
    report: Arc<StdMutex<Option<RunnerReport>>>,
}

impl RunnerHandle {
    /// Scenario key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Generation id.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Mode fixed at creation.
    pub fn mode(&self) -> RunnerMode {
        self.mode
    }

    /// Request budget, if any.
    pub fn max_requests(&self) -> Option<u64> {
        self.max_requests
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunnerState {
        *self.state.borrow()
    }

    /// True while the loop has not exited.
    pub fn is_live(&self) -> bool {
        self.state() == RunnerState::Running
    }

    /// True while a recovery runner is still sending.
    pub fn is_recovering(&self) -> bool {
        self.is_live() && self.mode == RunnerMode::Recovering
    }

    /// True once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Final report, available once the runner has stopped.
    pub fn report(&self) -> Option<RunnerReport> {
        self.report
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Status snapshot.
    pub fn status(&self) -> RunnerStatus {
        RunnerStatus {
            is_live: self.is_live(),
            is_recovering: self.is_recovering(),
        }
    }

    /// Waits until the runner reaches `Stopped`.
    pub async fn wait_stopped(&self) {
        let mut state = self.state.clone();
        // Err means the runner task is gone, which is stopped too
        let _ = state.wait_for(|s| *s == RunnerState::Stopped).await;
    }

    fn signal(&self) {
        self.cancel.cancel();
    }
}

/// Publishes `Stopped` when the runner task ends, even by panic.
struct LivenessGuard(watch::Sender<RunnerState>);

impl Drop for LivenessGuard {
    fn drop(&mut self) {
        self.0.send_replace(RunnerState::Stopped);
    }
}

/// Process-wide table mapping scenario key to its current runner.
pub struct ScenarioRegistry<Ctx, T, C>
where
    Ctx: DrillContext,
    T: TargetTransport,
    C: ConfigSource,
{
    context: Arc<Ctx>,
    sender: RequestSender<Ctx, T>,
    burst: BurstExecutor<Ctx, T>,
    config: Arc<C>,
    settings: EngineSettings,
    catalog: ScenarioCatalog,
    slots: HashMap<String, Mutex<Option<RunnerHandle>>>,
}

impl<Ctx, T, C> ScenarioRegistry<Ctx, T, C>
where
    Ctx: DrillContext,
    T: TargetTransport,
    C: ConfigSource,
{
    /// Creates a registry with one empty slot per catalog key.
    pub fn new(
        context: Arc<Ctx>,
        transport: Arc<T>,
        config: Arc<C>,
        catalog: ScenarioCatalog,
        settings: EngineSettings,
    ) -> Self {
        let sender = RequestSender::new(
            Arc::clone(&context),
            transport,
            settings.request_timeout,
            settings.test_item_id.clone(),
        );
        let burst = BurstExecutor::new(
            sender.clone(),
            settings.burst_units,
            settings.burst_unit_timeout,
        );
        let slots = catalog
            .keys()
            .map(|key| (key.to_string(), Mutex::new(None)))
            .collect();

        Self {
            context,
            sender,
            burst,
            config,
            settings,
            catalog,
            slots,
        }
    }

    /// Known scenarios.
    pub fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    /// Engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Live config source shared with runners.
    pub fn config(&self) -> &Arc<C> {
        &self.config
    }

    /// Replaces any runner for `key` with a fresh one.
    ///
    /// The previous runner is cancelled and given `retire_grace` to stop
    /// before the new one is spawned.
    pub async fn start(
        &self,
        key: &str,
        max_requests: Option<u64>,
        recovering: bool,
    ) -> Result<RunnerHandle, EngineError> {
        let definition = self
            .catalog
            .get(key)
            .cloned()
            .ok_or_else(|| EngineError::unknown(key))?;
        let slot = self.slots.get(key).ok_or_else(|| EngineError::unknown(key))?;

        let mut current = slot.lock().await;
        if let Some(previous) = current.take() {
            self.retire(previous).await;
        }

        let mode = if recovering {
            RunnerMode::Recovering
        } else {
            RunnerMode::Injecting
        };
        let handle = self.launch(definition, max_requests, mode);
        *current = Some(handle.clone());
        Ok(handle)
    }

    /// Signals the runner for `key` to stop. Does not wait for it.
    ///
    /// Returns true if a runner was signalled; unknown keys are a no-op.
    pub async fn stop(&self, key: &str) -> bool {
        let Some(slot) = self.slots.get(key) else {
            return false;
        };
        let current = slot.lock().await;
        match current.as_ref() {
            Some(handle) => {
                let was_live = handle.is_live();
                handle.signal();
                if was_live {
                    info!("Stopping runner {} for {}", handle.run_id(), key);
                }
                was_live
            }
            None => false,
        }
    }

    /// Signals every runner. Returns, per catalog key, whether a live runner
    /// was signalled.
    pub async fn stop_all(&self) -> BTreeMap<String, bool> {
        let mut stopped = BTreeMap::new();
        for key in self.catalog.keys() {
            stopped.insert(key.to_string(), self.stop(key).await);
        }
        stopped
    }

    /// Status of every key that has had a runner.
    pub async fn status(&self) -> BTreeMap<String, RunnerStatus> {
        let mut statuses = BTreeMap::new();
        for key in self.catalog.keys() {
            if let Some(handle) = self.handle(key).await {
                statuses.insert(key.to_string(), handle.status());
            }
        }
        statuses
    }

    /// Current handle for `key`, if one was ever started.
    pub async fn handle(&self, key: &str) -> Option<RunnerHandle> {
        let slot = self.slots.get(key)?;
        slot.lock().await.clone()
    }

    /// Number of runners currently live.
    pub async fn live_count(&self) -> usize {
        self.status().await.values().filter(|s| s.is_live).count()
    }

    async fn retire(&self, previous: RunnerHandle) {
        previous.signal();
        if !previous.is_live() {
            return;
        }
        let grace = self.settings.retire_grace;
        if tokio::time::timeout(grace, previous.wait_stopped()).await.is_err() {
            warn!(
                "Runner {} for {} still busy after {:?}, starting replacement anyway",
                previous.run_id(),
                previous.key(),
                grace
            );
        }
    }

    fn launch(
        &self,
        definition: ScenarioDefinition,
        max_requests: Option<u64>,
        mode: RunnerMode,
    ) -> RunnerHandle {
        let key = definition.key.clone();
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(RunnerState::Running);
        let report = Arc::new(StdMutex::new(None));

        let runner = ScenarioRunner::new(
            definition,
            Arc::clone(&self.context),
            self.sender.clone(),
            self.burst.clone(),
            Arc::clone(&self.config),
            cancel.clone(),
        )
        .with_max_requests(max_requests)
        .with_cadence(self.settings.cadence)
        .with_mode(mode);
        let run_id = runner.run_id();

        let guard = LivenessGuard(state_tx);
        let report_slot = Arc::clone(&report);
        self.context.spawn(&format!("runner:{}", key), async move {
            let finished = runner.run().await;
            *report_slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(finished);
            drop(guard);
        });

        RunnerHandle {
            key,
            run_id,
            mode,
            max_requests,
            cancel,
            state: state_rx,
            report,
        }
    }
}
