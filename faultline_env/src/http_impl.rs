//! Production implementation of TargetTransport using reqwest.

use crate::error::EnvError;
use crate::transport::TargetTransport;
use crate::types::{HttpMethod, TargetRequest, TargetResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

/// Production transport backed by a pooled `reqwest::Client`.
///
/// Timeouts are applied per request so one client serves both the 5s
/// target calls and the longer injection API calls.
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with a fresh client.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Wraps an existing client (shared pools, custom TLS, etc.).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Creates an Arc-wrapped transport for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl TargetTransport for HttpTransport {
    async fn send(&self, request: TargetRequest) -> Result<TargetResponse, EnvError> {
        if request.url.trim().is_empty() {
            return Err(EnvError::invalid_target("empty URL"));
        }

        let builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    EnvError::Timeout(request.timeout.as_millis() as u64)
                } else {
                    EnvError::from(err)
                }
            })?;

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();

        // Non-JSON bodies are kept verbatim for error details
        Ok(match serde_json::from_str(&text) {
            Ok(body) => TargetResponse {
                status,
                body: Some(body),
                text: None,
            },
            Err(_) => TargetResponse {
                status,
                body: None,
                text: (!text.is_empty()).then_some(text),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_url_is_rejected_without_io() {
        let transport = HttpTransport::new();
        let err = transport.send(TargetRequest::get("")).await.unwrap_err();
        assert!(matches!(err, EnvError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn test_relative_url_is_an_error_not_a_panic() {
        let transport = HttpTransport::new();
        let result = transport.send(TargetRequest::get("/items")).await;
        assert!(result.is_err());
    }
}
