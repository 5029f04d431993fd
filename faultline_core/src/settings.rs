//! Engine timing and sizing knobs.

use std::time::Duration;

/// Configuration for the scenario engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Pause between runner cycles (default: 2s)
    pub cadence: Duration,

    /// How long `start` waits for a replaced runner to stop (default: 3s)
    pub retire_grace: Duration,

    /// Concurrent requests per burst (default: 5)
    pub burst_units: usize,

    /// Upper bound on each burst unit (default: 10s)
    pub burst_unit_timeout: Duration,

    /// Per-call timeout for target requests (default: 5s)
    pub request_timeout: Duration,

    /// Requests sent after a recovery to let alarms settle (default: 30)
    pub recovery_budget: u64,

    /// Item id used by read-by-id traffic (default: "test-id-1")
    pub test_item_id: String,

    /// Timeout for inject/recover calls to the injection API (default: 15s)
    pub injection_timeout: Duration,

    /// Timeout for each recover call during recover-all (default: 10s)
    pub recover_all_timeout: Duration,

    /// Timeout for status calls to the injection API (default: 10s)
    pub status_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cadence: Duration::from_secs(2),
            retire_grace: Duration::from_secs(3),
            burst_units: 5,
            burst_unit_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
            recovery_budget: 30,
            test_item_id: "test-id-1".to_string(),
            injection_timeout: Duration::from_secs(15),
            recover_all_timeout: Duration::from_secs(10),
            status_timeout: Duration::from_secs(10),
        }
    }
}

impl EngineSettings {
    /// Sets the cycle cadence.
    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    /// Sets the retirement grace period.
    pub fn with_retire_grace(mut self, grace: Duration) -> Self {
        self.retire_grace = grace;
        self
    }

    /// Sets the burst size.
    pub fn with_burst_units(mut self, units: usize) -> Self {
        self.burst_units = units;
        self
    }

    /// Sets the recovery request budget.
    pub fn with_recovery_budget(mut self, budget: u64) -> Self {
        self.recovery_budget = budget;
        self
    }
}
