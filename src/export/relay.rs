//! Mail-relay client.
//!
//! The relay is an HTTP function that emails a base64 PDF:
//! `POST {base}/functions/v1/send-report-email` with a bearer token that is
//! also sent as the `apikey` header.

use super::summary::ReportSummary;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Relay endpoint path under the base URL.
pub const RELAY_PATH: &str = "/functions/v1/send-report-email";

/// Base URL used when `RELAY_BASE_URL` is unset.
pub const DEFAULT_RELAY_BASE_URL: &str = "http://localhost:54321";

/// Token used when `RELAY_TOKEN` is unset.
pub const DEFAULT_RELAY_TOKEN: &str = "public-anon-key";

/// Relay connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    /// Base URL (no trailing path)
    pub base_url: String,

    /// Bearer token
    pub token: String,

    /// Request timeout (client default when unset)
    pub timeout: Option<Duration>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_RELAY_BASE_URL.to_string(),
            token: DEFAULT_RELAY_TOKEN.to_string(),
            timeout: None,
        }
    }
}

impl RelayConfig {
    /// Create a config for an explicit endpoint.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            timeout: None,
        }
    }

    /// Read `RELAY_BASE_URL` and `RELAY_TOKEN`, falling back to the built-in
    /// defaults for unset or empty variables.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let config = Self {
            base_url: var("RELAY_BASE_URL").unwrap_or_else(|| DEFAULT_RELAY_BASE_URL.to_string()),
            token: var("RELAY_TOKEN").unwrap_or_else(|| DEFAULT_RELAY_TOKEN.to_string()),
            timeout: None,
        };
        if config.token == DEFAULT_RELAY_TOKEN {
            log::warn!("RELAY_TOKEN not set, using the built-in token");
        }
        config
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Full endpoint URL.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), RELAY_PATH)
    }
}

/// JSON body posted to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailPayload {
    /// Base64-encoded PDF
    pub pdf_base64: String,

    /// Saved file name
    pub filename: String,

    /// Form type identifier
    pub form_type: String,

    /// Recipient address
    pub to: String,

    /// Extra text for the email body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_message: Option<String>,

    /// Report metadata
    pub summary: ReportSummary,
}

/// Raw relay answer.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayResponse {
    /// HTTP status code
    pub status: u16,

    /// Parsed JSON body (`Value::String` for non-JSON bodies)
    pub body: Value,
}

impl RelayResponse {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Best error message: body `error`, then `message`, then the status.
    pub fn error_message(&self) -> String {
        ["error", "message"]
            .iter()
            .find_map(|key| match self.body.get(key) {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
                Some(Value::Object(o)) => o
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            })
            .unwrap_or_else(|| format!("HTTP {}", self.status))
    }

    /// Email id on success, [`Error::EmailServer`] otherwise.
    pub fn into_result(self) -> Result<Option<String>> {
        if self.is_success() {
            Ok(self
                .body
                .get("emailId")
                .and_then(|id| match id {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                }))
        } else {
            Err(Error::EmailServer {
                status: self.status,
                message: self.error_message(),
            })
        }
    }
}

/// Sends documents by email.
#[async_trait]
pub trait MailRelay: Send + Sync {
    /// Post one payload. Transport failures are `Err`; any HTTP answer,
    /// successful or not, is `Ok`.
    async fn send(&self, payload: &EmailPayload) -> Result<RelayResponse>;
}

/// [`MailRelay`] over HTTP.
pub struct HttpMailRelay {
    client: reqwest::Client,
    config: RelayConfig,
}

impl HttpMailRelay {
    /// Create a relay client.
    pub fn new(config: RelayConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Relay settings.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

#[async_trait]
impl MailRelay for HttpMailRelay {
    async fn send(&self, payload: &EmailPayload) -> Result<RelayResponse> {
        let endpoint = self.config.endpoint();
        log::info!("posting {} to {}", payload.filename, endpoint);

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.config.token)
            .header("apikey", &self.config.token)
            .json(payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(RelayResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint() {
        let config = RelayConfig::new("https://relay.example.com/", "t");
        assert_eq!(
            config.endpoint(),
            "https://relay.example.com/functions/v1/send-report-email"
        );
    }

    #[test]
    fn test_payload_is_camel_case() {
        let payload = EmailPayload {
            pdf_base64: "JVBERi0=".into(),
            filename: "parte.pdf".into(),
            form_type: "parte".into(),
            to: "ops@example.com".into(),
            additional_message: None,
            summary: ReportSummary::default(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["pdfBase64"], "JVBERi0=");
        assert_eq!(value["formType"], "parte");
        assert!(value.get("additionalMessage").is_none());
        assert_eq!(value["summary"]["pozo"], "");
    }

    #[test]
    fn test_success_response() {
        let response = RelayResponse {
            status: 200,
            body: json!({ "emailId": "abc123" }),
        };
        assert_eq!(response.into_result().unwrap(), Some("abc123".to_string()));
    }

    #[test]
    fn test_error_message_preference() {
        let response = RelayResponse {
            status: 500,
            body: json!({ "error": "SMTP down", "message": "ignored" }),
        };
        assert_eq!(response.error_message(), "SMTP down");

        let response = RelayResponse {
            status: 422,
            body: json!({ "message": "bad recipient" }),
        };
        assert_eq!(response.error_message(), "bad recipient");

        let response = RelayResponse {
            status: 502,
            body: Value::String("<html>".into()),
        };
        assert_eq!(response.error_message(), "HTTP 502");
    }

    #[test]
    fn test_non_2xx_is_server_error() {
        let response = RelayResponse {
            status: 401,
            body: json!({}),
        };
        match response.into_result() {
            Err(Error::EmailServer { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "HTTP 401");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
