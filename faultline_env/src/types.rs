//! Common types for the Faultline environment abstraction.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default per-call timeout for target requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the engine sends traffic and fault commands.
///
/// Read fresh on every runner cycle, never cached, so edits take effect
/// without restarting a runner. Field names match the on-disk `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Error-injection API endpoint (single POST endpoint taking an `action`)
    #[serde(default)]
    pub error_injection_api: String,

    /// Base URL of the sample API that receives synthetic traffic
    #[serde(default)]
    pub sample_api: String,
}

impl TargetConfig {
    /// Creates a config from the two endpoint URLs.
    pub fn new(error_injection_api: impl Into<String>, sample_api: impl Into<String>) -> Self {
        Self {
            error_injection_api: error_injection_api.into(),
            sample_api: sample_api.into(),
        }
    }

    /// True when both endpoints are set.
    pub fn is_configured(&self) -> bool {
        !self.error_injection_api.trim().is_empty() && !self.sample_api.trim().is_empty()
    }

    /// Joins a path onto the sample API base URL.
    pub fn sample_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.sample_api.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// HTTP verb of an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

/// A single outbound request, transport-agnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRequest {
    /// HTTP verb
    pub method: HttpMethod,

    /// Fully-qualified URL
    pub url: String,

    /// JSON body (POST only)
    pub body: Option<serde_json::Value>,

    /// Per-call timeout
    pub timeout: Duration,
}

impl TargetRequest {
    /// Creates a GET request with the default timeout.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            body: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Creates a POST request with a JSON body and the default timeout.
    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body: Some(body),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Overrides the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Response as seen by the engine: a status and an optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetResponse {
    /// HTTP status code
    pub status: u16,

    /// Parsed JSON body, if the response carried one
    pub body: Option<serde_json::Value>,

    /// Raw body text when it was not JSON
    pub text: Option<String>,
}

impl TargetResponse {
    /// A response with a status and no body.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: None,
            text: None,
        }
    }

    /// A response with a JSON body.
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body: Some(body),
            text: None,
        }
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_config_configured() {
        assert!(!TargetConfig::default().is_configured());
        assert!(!TargetConfig::new("http://inject", "  ").is_configured());
        assert!(TargetConfig::new("http://inject", "http://sample").is_configured());
    }

    #[test]
    fn test_sample_url_joins_cleanly() {
        let config = TargetConfig::new("", "http://sample/prod/");
        assert_eq!(config.sample_url("/items"), "http://sample/prod/items");
        assert_eq!(config.sample_url("items/test-id-1"), "http://sample/prod/items/test-id-1");
    }

    #[test]
    fn test_config_parses_partial_json() {
        let config: TargetConfig = serde_json::from_str(r#"{"sample_api": "http://s"}"#).unwrap();
        assert_eq!(config.sample_api, "http://s");
        assert_eq!(config.error_injection_api, "");
    }

    #[test]
    fn test_response_success_range() {
        assert!(TargetResponse::status(200).is_success());
        assert!(TargetResponse::status(204).is_success());
        assert!(!TargetResponse::status(429).is_success());
        assert!(!TargetResponse::status(500).is_success());
    }
}
