//! Drill runner - one inject, hold, recover cycle for a scenario.

use faultline_core::{EngineError, ExitReason, RunnerMode, RunnerReport, ScenarioControl};
use faultline_env::{ConfigSource, DrillContext, TargetTransport};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Results from running a drill.
#[derive(Debug, Clone, Serialize)]
pub struct DrillResult {
    /// Scenario key that was drilled
    pub key: String,

    /// Whether both phases behaved as expected
    pub passed: bool,

    /// Context time spent holding the fault
    pub held_secs: f64,

    /// Fault-phase runner summary
    pub fault_report: Option<RunnerReport>,

    /// Recovery-phase runner summary
    pub recovery_report: Option<RunnerReport>,

    /// Failure message if any
    pub failure_reason: Option<String>,
}

/// Injects `key`, keeps fault traffic flowing for `hold`, then recovers and
/// waits for the bounded recovery traffic to finish.
///
/// The hold is slept on `context`, the same clock the runners pace their
/// cadence on, so a hold of `h` sees roughly `h / cadence` fault cycles.
pub async fn run_drill<Ctx, T, C>(
    control: &ScenarioControl<Ctx, T, C>,
    context: &Ctx,
    key: &str,
    hold: Duration,
) -> Result<DrillResult, EngineError>
where
    Ctx: DrillContext,
    T: TargetTransport,
    C: ConfigSource,
{
    let settings = control.registry().settings();
    let budget = settings.recovery_budget;

    info!("Drill {}: injecting", key);
    control.inject(key).await?;
    let fault = control.runner(key).await.ok_or_else(|| EngineError::unknown(key))?;

    let started = context.now();
    context.sleep(hold).await;
    let held = context.now() - started;
    debug!("Drill {}: held fault for {:?}", key, held);

    info!("Drill {}: recovering", key);
    control.recover(key).await?;
    fault.wait_stopped().await;

    let recovery = control.runner(key).await.ok_or_else(|| EngineError::unknown(key))?;
    recovery.wait_stopped().await;

    let fault_report = fault.report();
    let recovery_report = recovery.report();
    let failure_reason = judge(fault_report.as_ref(), recovery_report.as_ref(), budget);
    if let Some(reason) = &failure_reason {
        warn!("Drill {} failed: {}", key, reason);
    }

    Ok(DrillResult {
        key: key.to_string(),
        passed: failure_reason.is_none(),
        held_secs: held.as_secs_f64(),
        fault_report,
        recovery_report,
        failure_reason,
    })
}

fn judge(
    fault: Option<&RunnerReport>,
    recovery: Option<&RunnerReport>,
    budget: u64,
) -> Option<String> {
    let Some(fault) = fault else {
        return Some("fault runner left no report".to_string());
    };
    if fault.mode != RunnerMode::Injecting || fault.exit != ExitReason::Cancelled {
        return Some(format!("fault runner ended with {:?}", fault.exit));
    }
    let Some(recovery) = recovery else {
        return Some("recovery runner left no report".to_string());
    };
    if recovery.mode != RunnerMode::Recovering {
        return Some("second runner was not a recovery runner".to_string());
    }
    if recovery.exit != ExitReason::BudgetExhausted {
        return Some(format!("recovery runner ended with {:?}", recovery.exit));
    }
    if recovery.requests_issued != budget {
        return Some(format!(
            "recovery sent {} requests, expected {}",
            recovery.requests_issued, budget
        ));
    }
    None
}
