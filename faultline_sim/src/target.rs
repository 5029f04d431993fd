//! Simulated target APIs with fault injection.

use async_trait::async_trait;
use faultline_env::{EnvError, TargetRequest, TargetResponse, TargetTransport};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A request as seen by the simulated target.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Arrival order, starting at 0
    pub sequence: u64,

    /// The request itself
    pub request: TargetRequest,
}

/// Simulated sample API and error-injection API in one transport.
///
/// Requests are matched, in order, against:
/// 1. scripted replies for an exact URL
/// 2. per-prefix failure rates (drawn from a seeded ChaCha RNG)
/// 3. the default status
pub struct SimTarget {
    /// Seed the RNG was built from
    seed: u64,

    /// Deterministic RNG for failure draws
    rng: Mutex<ChaCha8Rng>,

    /// Every request, in arrival order
    log: Mutex<Vec<RecordedRequest>>,

    /// Exact-URL replies
    scripted: Mutex<HashMap<String, TargetResponse>>,

    /// (URL prefix, probability of a transport error)
    failure_rates: Mutex<Vec<(String, f64)>>,

    /// Status for everything else
    default_status: Mutex<u16>,

    /// Simulated response time
    latency: Mutex<Duration>,

    /// Requests currently being served
    in_flight: AtomicUsize,

    /// High-water mark of `in_flight`
    max_in_flight: AtomicUsize,
}

impl SimTarget {
    /// Creates a target that answers 200 to everything.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            log: Mutex::new(Vec::new()),
            scripted: Mutex::new(HashMap::new()),
            failure_rates: Mutex::new(Vec::new()),
            default_status: Mutex::new(200),
            latency: Mutex::new(Duration::ZERO),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Returns the seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Answers `url` with a fixed response.
    pub fn script(&self, url: impl Into<String>, response: TargetResponse) {
        lock(&self.scripted).insert(url.into(), response);
    }

    /// Makes requests under `prefix` fail at `rate` (0.0 - 1.0).
    pub fn set_failure_rate(&self, prefix: impl Into<String>, rate: f64) {
        let prefix = prefix.into();
        let mut rates = lock(&self.failure_rates);
        rates.retain(|(p, _)| *p != prefix);
        rates.push((prefix, rate.clamp(0.0, 1.0)));
    }

    /// Removes every failure rate.
    pub fn heal_all(&self) {
        lock(&self.failure_rates).clear();
    }

    /// Sets the status for unscripted, non-failing requests.
    pub fn set_default_status(&self, status: u16) {
        *lock(&self.default_status) = status;
    }

    /// Sets the simulated response time.
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = latency;
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.log).clone()
    }

    /// Number of requests whose URL starts with `prefix`.
    pub fn count_with_prefix(&self, prefix: &str) -> usize {
        lock(&self.log)
            .iter()
            .filter(|r| r.request.url.starts_with(prefix))
            .count()
    }

    /// Highest number of requests served at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn failure_rate(&self, url: &str) -> f64 {
        lock(&self.failure_rates)
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .map(|(_, rate)| *rate)
            .fold(0.0, f64::max)
    }

    fn reply(&self, url: &str) -> Result<TargetResponse, EnvError> {
        if let Some(response) = lock(&self.scripted).get(url) {
            return Ok(response.clone());
        }
        let rate = self.failure_rate(url);
        if rate > 0.0 && lock(&self.rng).gen_bool(rate) {
            return Err(EnvError::network("simulated connection refused"));
        }
        Ok(TargetResponse::status(*lock(&self.default_status)))
    }
}

#[async_trait]
impl TargetTransport for SimTarget {
    async fn send(&self, request: TargetRequest) -> Result<TargetResponse, EnvError> {
        if request.url.trim().is_empty() {
            return Err(EnvError::invalid_target("empty URL"));
        }

        let url = request.url.clone();
        {
            let mut log = lock(&self.log);
            let sequence = log.len() as u64;
            log.push(RecordedRequest { sequence, request });
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = *lock(&self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let result = self.reply(&url);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
