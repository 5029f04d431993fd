//! In-crate test doubles.

use async_trait::async_trait;
use faultline_env::{EnvError, TargetRequest, TargetResponse, TargetTransport};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Records every request; replies with a default status, a per-URL reply,
/// or a transport error. Tracks how many requests are in flight at once.
pub(crate) struct MockTarget {
    requests: Mutex<Vec<TargetRequest>>,
    replies: Mutex<HashMap<String, TargetResponse>>,
    default_status: AtomicU16,
    failing: AtomicBool,
    latency: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTarget {
    pub(crate) fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            replies: Mutex::new(HashMap::new()),
            default_status: AtomicU16::new(200),
            failing: AtomicBool::new(false),
            latency: Mutex::new(Duration::ZERO),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn set_default_status(&self, status: u16) {
        self.default_status.store(status, Ordering::SeqCst);
    }

    pub(crate) fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub(crate) fn reply(&self, url: &str, response: TargetResponse) {
        self.replies.lock().unwrap().insert(url.to_string(), response);
    }

    pub(crate) fn requests(&self) -> Vec<TargetRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn requests_to(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TargetTransport for MockTarget {
    async fn send(&self, request: TargetRequest) -> Result<TargetResponse, EnvError> {
        self.requests.lock().unwrap().push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(reply) = self.replies.lock().unwrap().get(&request.url) {
            return Ok(reply.clone());
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(EnvError::network("connection refused"));
        }
        Ok(TargetResponse::status(self.default_status.load(Ordering::SeqCst)))
    }
}
