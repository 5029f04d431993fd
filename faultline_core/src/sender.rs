//! RequestSender - one synthetic request against the sample API.
//!
//! Failures are the expected signal while a fault is injected, so nothing
//! here returns an error: every call ends in a [`RequestOutcome`] and a log
//! line, and the runner's cadence is never disturbed.

use crate::scenario::RequestShape;
use faultline_env::{DrillContext, TargetConfig, TargetRequest, TargetTransport};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Result of a single synthetic request, for observability only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// 2xx response
    Succeeded { status: u16 },

    /// Non-2xx response
    Rejected { status: u16 },

    /// No response (timeout, connection refused, bad URL)
    Failed { reason: String },
}

impl RequestOutcome {
    /// True for 2xx responses.
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Succeeded { .. })
    }
}

/// Issues one request of a given shape against the target.
pub struct RequestSender<Ctx, T>
where
    Ctx: DrillContext,
    T: TargetTransport,
{
    context: Arc<Ctx>,
    transport: Arc<T>,
    timeout: Duration,
    test_item_id: String,
}

impl<Ctx, T> Clone for RequestSender<Ctx, T>
where
    Ctx: DrillContext,
    T: TargetTransport,
{
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            transport: Arc::clone(&self.transport),
            timeout: self.timeout,
            test_item_id: self.test_item_id.clone(),
        }
    }
}

impl<Ctx, T> RequestSender<Ctx, T>
where
    Ctx: DrillContext,
    T: TargetTransport,
{
    /// Creates a sender with the given per-call timeout and read-by-id item.
    pub fn new(
        context: Arc<Ctx>,
        transport: Arc<T>,
        timeout: Duration,
        test_item_id: impl Into<String>,
    ) -> Self {
        Self {
            context,
            transport,
            timeout,
            test_item_id: test_item_id.into(),
        }
    }

    /// Builds the request for `shape` against the given config.
    pub fn build_request(&self, config: &TargetConfig, shape: RequestShape) -> TargetRequest {
        let request = match shape {
            RequestShape::ReadCollection => TargetRequest::get(config.sample_url("items")),
            RequestShape::ReadById => {
                TargetRequest::get(config.sample_url(&format!("items/{}", self.test_item_id)))
            }
            RequestShape::Write => TargetRequest::post(
                config.sample_url("items"),
                json!({
                    "name": "Error Trigger",
                    "content": format!("Request at {}", self.context.unix_secs()),
                }),
            ),
        };
        request.with_timeout(self.timeout)
    }

    /// Sends exactly one request. Never fails.
    pub async fn send(&self, config: &TargetConfig, shape: RequestShape) -> RequestOutcome {
        if config.sample_api.trim().is_empty() {
            warn!("Request failed ({}): sample API not configured", shape);
            return RequestOutcome::Failed {
                reason: "sample API not configured".to_string(),
            };
        }

        let request = self.build_request(config, shape);
        match self.transport.send(request).await {
            Ok(response) if response.is_success() => RequestOutcome::Succeeded {
                status: response.status,
            },
            Ok(response) => {
                debug!("Request rejected ({}): HTTP {}", shape, response.status);
                RequestOutcome::Rejected {
                    status: response.status,
                }
            }
            Err(e) => {
                warn!("Request failed ({}): {}", shape, e);
                RequestOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTarget;
    use faultline_env::{HttpMethod, TokioContext};

    fn sender(target: Arc<MockTarget>) -> RequestSender<TokioContext, MockTarget> {
        RequestSender::new(
            TokioContext::shared(),
            target,
            Duration::from_secs(5),
            "test-id-1",
        )
    }

    fn config() -> TargetConfig {
        TargetConfig::new("http://inject", "http://sample")
    }

    #[tokio::test]
    async fn test_read_collection_hits_items() {
        let target = Arc::new(MockTarget::new());
        let outcome = sender(target.clone()).send(&config(), RequestShape::ReadCollection).await;

        assert!(outcome.is_success());
        let sent = target.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, HttpMethod::Get);
        assert_eq!(sent[0].url, "http://sample/items");
        assert_eq!(sent[0].timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_read_by_id_uses_fixed_item() {
        let target = Arc::new(MockTarget::new());
        sender(target.clone()).send(&config(), RequestShape::ReadById).await;
        assert_eq!(target.requests()[0].url, "http://sample/items/test-id-1");
    }

    #[tokio::test]
    async fn test_write_body_is_labelled_and_timestamped() {
        let target = Arc::new(MockTarget::new());
        sender(target.clone()).send(&config(), RequestShape::Write).await;

        let sent = target.requests();
        assert_eq!(sent[0].method, HttpMethod::Post);
        let body = sent[0].body.as_ref().unwrap();
        assert_eq!(body["name"], "Error Trigger");
        assert!(body["content"].as_str().unwrap().starts_with("Request at "));
    }

    #[tokio::test]
    async fn test_transport_error_is_absorbed() {
        let target = Arc::new(MockTarget::new());
        target.set_failing(true);

        let outcome = sender(target.clone()).send(&config(), RequestShape::Write).await;
        assert!(matches!(outcome, RequestOutcome::Failed { .. }));
        assert_eq!(target.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_error_status_is_rejected_not_failed() {
        let target = Arc::new(MockTarget::new());
        target.set_default_status(429);

        let outcome = sender(target).send(&config(), RequestShape::Write).await;
        assert_eq!(outcome, RequestOutcome::Rejected { status: 429 });
    }

    #[tokio::test]
    async fn test_unconfigured_sample_api_skips_transport() {
        let target = Arc::new(MockTarget::new());
        let outcome = sender(target.clone())
            .send(&TargetConfig::default(), RequestShape::ReadCollection)
            .await;

        assert!(matches!(outcome, RequestOutcome::Failed { .. }));
        assert!(target.requests().is_empty());
    }
}
