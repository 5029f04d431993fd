//! Boundary between the engine and whatever drives it.
//!
//! Each operation pairs a call to the external error-injection API with the
//! matching registry action: a runner only starts after the API accepted the
//! fault (or its recovery).

use crate::error::EngineError;
use crate::registry::{RunnerHandle, ScenarioRegistry};
use faultline_env::{ConfigSource, DrillContext, TargetRequest, TargetResponse, TargetTransport};
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Command sent to the error-injection API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionAction {
    Inject(String),
    Recover(String),
    Status,
}

impl InjectionAction {
    /// Action name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            InjectionAction::Inject(_) => "inject",
            InjectionAction::Recover(_) => "recover",
            InjectionAction::Status => "status",
        }
    }

    /// JSON body for the API.
    pub fn body(&self) -> Value {
        match self {
            InjectionAction::Inject(key) | InjectionAction::Recover(key) => {
                json!({ "action": self.name(), "error_type": key })
            }
            InjectionAction::Status => json!({ "action": "status" }),
        }
    }
}

/// Per-scenario result of `recover_all`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// API answered 200
    Recovered,

    /// API answered with another status
    Failed,

    /// API could not be called
    Error(String),
}

impl std::fmt::Display for RecoveryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoveryOutcome::Recovered => write!(f, "recovered"),
            RecoveryOutcome::Failed => write!(f, "failed"),
            RecoveryOutcome::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

impl Serialize for RecoveryOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result of probing both configured APIs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionReport {
    pub connected: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Drives the registry together with the external injection API.
pub struct ScenarioControl<Ctx, T, C>
where
    Ctx: DrillContext,
    T: TargetTransport,
    C: ConfigSource,
{
    registry: Arc<ScenarioRegistry<Ctx, T, C>>,
    transport: Arc<T>,
}

impl<Ctx, T, C> ScenarioControl<Ctx, T, C>
where
    Ctx: DrillContext,
    T: TargetTransport,
    C: ConfigSource,
{
    /// Creates a control surface over a registry.
    ///
    /// `transport` carries the injection API calls; it is usually the same
    /// transport the registry's runners use.
    pub fn new(registry: Arc<ScenarioRegistry<Ctx, T, C>>, transport: Arc<T>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Arc<ScenarioRegistry<Ctx, T, C>> {
        &self.registry
    }

    /// Injects the fault, then starts unbounded traffic.
    pub async fn inject(&self, key: &str) -> Result<Value, EngineError> {
        let name = self.display_name(key)?;
        let timeout = self.registry.settings().injection_timeout;

        let response = self
            .call_api(InjectionAction::Inject(key.to_string()), timeout)
            .await?;
        let response = Self::require_ok("inject", response)?;

        self.registry.start(key, None, false).await?;
        info!("{} injected, continuous requests started", name);

        Ok(with_message(
            response.body,
            format!("{} injected, continuous requests started", name),
        ))
    }

    /// Stops fault traffic, clears the fault, then sends a bounded batch of
    /// normal traffic so alarms can return to OK.
    pub async fn recover(&self, key: &str) -> Result<Value, EngineError> {
        let name = self.display_name(key)?;
        let settings = self.registry.settings();
        let budget = settings.recovery_budget;

        self.registry.stop(key).await;

        let response = self
            .call_api(InjectionAction::Recover(key.to_string()), settings.injection_timeout)
            .await?;
        let response = Self::require_ok("recover", response)?;

        self.registry.start(key, Some(budget), true).await?;
        info!("{} recovered, sending {} recovery requests", name, budget);

        Ok(with_message(
            response.body,
            format!(
                "{} recovered, sending {} normal requests to restore alarm",
                name, budget
            ),
        ))
    }

    /// Stops every runner and asks the API to recover every known scenario.
    ///
    /// Always returns an outcome for every catalog key.
    pub async fn recover_all(&self) -> BTreeMap<String, RecoveryOutcome> {
        let timeout = self.registry.settings().recover_all_timeout;
        let keys: Vec<String> = self.registry.catalog().keys().map(str::to_string).collect();

        let mut results = BTreeMap::new();
        for key in keys {
            self.registry.stop(&key).await;
            let outcome = match self
                .call_api(InjectionAction::Recover(key.clone()), timeout)
                .await
            {
                Ok(response) if response.status == 200 => RecoveryOutcome::Recovered,
                Ok(response) => {
                    warn!("Recover {} returned HTTP {}", key, response.status);
                    RecoveryOutcome::Failed
                }
                Err(e) => RecoveryOutcome::Error(e.to_string()),
            };
            results.insert(key, outcome);
        }
        results
    }

    /// Fetches fault status from the API and merges in runner activity.
    pub async fn status(&self) -> Result<Value, EngineError> {
        let timeout = self.registry.settings().status_timeout;
        let response = self.call_api(InjectionAction::Status, timeout).await?;
        let response = Self::require_ok("status", response)?;

        let runners = self.registry.status().await;
        let active: serde_json::Map<String, Value> = runners
            .iter()
            .map(|(k, s)| (k.clone(), Value::Bool(s.is_live)))
            .collect();
        let recovering: serde_json::Map<String, Value> = runners
            .iter()
            .map(|(k, s)| (k.clone(), Value::Bool(s.is_recovering)))
            .collect();

        let mut data = match response.body {
            Some(Value::Object(map)) => map,
            Some(other) => {
                let mut map = serde_json::Map::new();
                map.insert("injection_status".to_string(), other);
                map
            }
            None => serde_json::Map::new(),
        };
        data.insert("active_requests".to_string(), Value::Object(active));
        data.insert("recovery_requests".to_string(), Value::Object(recovering));
        Ok(Value::Object(data))
    }

    /// Probes the injection API and the sample API with the live config.
    pub async fn check_connection(&self) -> ConnectionReport {
        let config = self.registry.config().current();
        if !config.is_configured() {
            return ConnectionReport {
                connected: false,
                errors: vec!["API endpoints not configured".to_string()],
            };
        }

        let mut errors = Vec::new();

        let probe = TargetRequest::post(
            config.error_injection_api.clone(),
            InjectionAction::Status.body(),
        )
        .with_timeout(Duration::from_secs(5));
        match self.transport.send(probe).await {
            Ok(response) if response.status == 200 => {}
            Ok(response) => {
                errors.push(format!("Error Injection API returned {}", response.status))
            }
            Err(e) if e.is_timeout() => errors.push("Error Injection API timed out".to_string()),
            Err(e) => errors.push(format!("Error Injection API: {}", e)),
        }

        // Any response from the sample API counts, 4xx/5xx may be an active fault
        let probe =
            TargetRequest::get(config.sample_url("items")).with_timeout(Duration::from_secs(5));
        match self.transport.send(probe).await {
            Ok(_) => {}
            Err(e) if e.is_timeout() => errors.push("Sample API timed out".to_string()),
            Err(e) => errors.push(format!("Sample API: {}", e)),
        }

        ConnectionReport {
            connected: errors.is_empty(),
            errors,
        }
    }

    /// Handle of a scenario's current runner.
    pub async fn runner(&self, key: &str) -> Option<RunnerHandle> {
        self.registry.handle(key).await
    }

    fn display_name(&self, key: &str) -> Result<String, EngineError> {
        self.registry
            .catalog()
            .get(key)
            .map(|d| d.name.clone())
            .ok_or_else(|| EngineError::unknown(key))
    }

    async fn call_api(
        &self,
        action: InjectionAction,
        timeout: Duration,
    ) -> Result<TargetResponse, EngineError> {
        let config = self.registry.config().current();
        if config.error_injection_api.trim().is_empty() {
            return Err(EngineError::NotConfigured);
        }
        let request = TargetRequest::post(config.error_injection_api.clone(), action.body())
            .with_timeout(timeout);
        Ok(self.transport.send(request).await?)
    }

    fn require_ok(action: &str, response: TargetResponse) -> Result<TargetResponse, EngineError> {
        if response.status == 200 {
            return Ok(response);
        }
        let details = response
            .text
            .clone()
            .or_else(|| response.body.as_ref().map(Value::to_string))
            .unwrap_or_default();
        Err(EngineError::InjectionRejected {
            action: action.to_string(),
            status: response.status,
            details,
        })
    }
}

fn with_message(body: Option<Value>, message: String) -> Value {
    let mut map = match body {
        Some(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    map.insert("message".to_string(), Value::String(message));
    Value::Object(map)
}
