//! Faultline CLI
//!
//! Drive fault-injection drills against a real deployment, or rehearse them
//! against the simulated target with `--sim`.

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};
use faultline_core::{EngineSettings, ScenarioCatalog, ScenarioControl, ScenarioRegistry};
use faultline_env::{
    ConfigSource, DrillContext, HttpTransport, JsonFileConfig, LayeredConfig, TargetConfig,
    TargetResponse, TargetTransport, TokioContext,
};
use faultline_sim::{run_drill, SimContext, SimTarget};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const SIM_INJECTION_API: &str = "sim://error-injection";
const SIM_SAMPLE_API: &str = "sim://sample-api";

#[derive(Parser, Debug)]
#[command(name = "faultline")]
#[command(about = "Run fault-injection drills against a sample API", long_about = None)]
struct Args {
    /// JSON file holding `error_injection_api` and `sample_api`, re-read on every cycle
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Override the error-injection API URL
    #[arg(long)]
    injection_api: Option<String>,

    /// Override the sample API base URL
    #[arg(long)]
    sample_api: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Use the simulated target and virtual clock instead of the network
    #[arg(long)]
    sim: bool,

    /// Seed for simulated failures (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Probability that a simulated sample API request fails
    #[arg(long, default_value = "0.0")]
    failure_rate: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the available scenarios
    Scenarios,

    /// Check that both APIs are reachable
    Check,

    /// Inject a scenario, hold it, then recover
    Drill {
        /// Scenario key, e.g. `latency`
        key: String,

        /// Seconds to keep the fault active
        #[arg(long, default_value = "10")]
        hold: u64,
    },

    /// Stop all traffic and recover every scenario
    RecoverAll,

    /// Show fault status from the injection API
    Status,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    // Simulation runs on a paused clock that jumps to the next timer when idle
    let runtime = if args.sim {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()?
    } else {
        tokio::runtime::Builder::new_multi_thread().enable_all().build()?
    };

    let ok = runtime.block_on(async {
        if args.sim {
            run_simulated(&args).await
        } else {
            let config = LayeredConfig::new(
                JsonFileConfig::new(&args.config),
                TargetConfig::new(
                    args.injection_api.clone().unwrap_or_default(),
                    args.sample_api.clone().unwrap_or_default(),
                ),
            );
            execute(&args, TokioContext::shared(), HttpTransport::shared(), config).await
        }
    })?;

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

/// Runs the command against the simulated target.
async fn run_simulated(args: &Args) -> anyhow::Result<bool> {
    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    let config = LayeredConfig::new(
        JsonFileConfig::new(&args.config),
        TargetConfig::new(
            args.injection_api.clone().unwrap_or_else(|| SIM_INJECTION_API.to_string()),
            args.sample_api.clone().unwrap_or_else(|| SIM_SAMPLE_API.to_string()),
        ),
    );
    let current = config.current();

    let target = Arc::new(SimTarget::new(seed));
    info!("Simulation mode (seed={})", target.seed());
    target.script(
        current.error_injection_api.clone(),
        TargetResponse::json(200, json!({ "mode": "simulated" })),
    );
    if args.failure_rate > 0.0 {
        target.set_failure_rate(current.sample_api.clone(), args.failure_rate);
    }

    let outcome = execute(args, SimContext::shared(), Arc::clone(&target), config).await?;
    info!("Simulated target saw {} requests", target.requests().len());
    Ok(outcome)
}

/// Runs the chosen command. Returns whether it succeeded.
async fn execute<Ctx, T, C>(
    args: &Args,
    context: Arc<Ctx>,
    transport: Arc<T>,
    config: C,
) -> anyhow::Result<bool>
where
    Ctx: DrillContext,
    T: TargetTransport,
    C: ConfigSource,
{
    let registry = ScenarioRegistry::new(
        Arc::clone(&context),
        Arc::clone(&transport),
        Arc::new(config),
        ScenarioCatalog::builtin(),
        EngineSettings::default(),
    );
    let control = ScenarioControl::new(Arc::new(registry), transport);

    match &args.command {
        Command::Scenarios => {
            let catalog = control.registry().catalog();
            if args.json {
                let list: Vec<_> = catalog
                    .iter()
                    .map(|d| {
                        json!({
                            "key": d.key,
                            "name": d.name,
                            "description": d.description,
                            "alarm": d.alarm,
                            "request": d.request_shape.to_string(),
                            "concurrent_burst": d.concurrent_burst,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                for d in catalog.iter() {
                    println!("{:<18} {:<36} alarm: {}", d.key, d.name, d.alarm);
                }
            }
            Ok(true)
        }

        Command::Check => {
            let report = control.check_connection().await;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.connected {
                info!("✓ Both APIs reachable");
            } else {
                for e in &report.errors {
                    error!("✗ {}", e);
                }
            }
            Ok(report.connected)
        }

        Command::Drill { key, hold } => {
            if !control.registry().catalog().contains(key) {
                bail!(
                    "unknown scenario '{}' (available: {})",
                    key,
                    control.registry().catalog().keys().collect::<Vec<_>>().join(", ")
                );
            }
            let result = run_drill(&control, &*context, key, Duration::from_secs(*hold)).await?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else if result.passed {
                let recovery = result.recovery_report.as_ref().map_or(0, |r| r.requests_issued);
                let fault = result.fault_report.as_ref().map_or(0, |r| r.requests_issued);
                info!(
                    "✓ {} PASSED ({} fault requests over {:.0}s, {} recovery requests)",
                    key, fault, result.held_secs, recovery
                );
            } else {
                error!(
                    "✗ {} FAILED: {}",
                    key,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
            Ok(result.passed)
        }

        Command::RecoverAll => {
            let results = control.recover_all().await;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for (key, outcome) in &results {
                    info!("{:<18} {}", key, outcome);
                }
            }
            Ok(results
                .values()
                .all(|o| *o == faultline_core::RecoveryOutcome::Recovered))
        }

        Command::Status => {
            let status = control.status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(true)
        }
    }
}
