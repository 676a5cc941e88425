//! Export outcomes.

use super::summary::ReportSummary;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Outcome of one export call whose document was rendered and saved.
///
/// Rendering failures never produce a result; they surface as `Err`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    /// Whether the relay accepted the email
    pub email_success: bool,

    /// Relay-assigned email id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_id: Option<String>,

    /// Best available failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_error: Option<String>,
}

impl ExportResult {
    /// Email delivered.
    pub fn sent(email_id: Option<String>) -> Self {
        Self {
            email_success: true,
            email_id,
            email_error: None,
        }
    }

    /// Email failed; the document was still saved.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            email_success: false,
            email_id: None,
            email_error: Some(error.into()),
        }
    }

    /// No recipient, so no email was attempted.
    pub fn not_sent() -> Self {
        Self::default()
    }

    /// Fold a relay outcome into a result. Server errors keep only their
    /// message; transport errors keep their description.
    pub fn from_delivery(outcome: Result<Option<String>>) -> Self {
        match outcome {
            Ok(id) => Self::sent(id),
            Err(crate::Error::EmailServer { message, .. }) => Self::failed(message),
            Err(crate::Error::EmailTransport(message)) => Self::failed(message),
            Err(other) => Self::failed(other.to_string()),
        }
    }
}

/// A rendered document before delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    /// PDF bytes
    pub bytes: Vec<u8>,

    /// Page count
    pub pages: usize,

    /// Metadata for the email body
    pub summary: ReportSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(ExportResult::sent(Some("id-1".into()))).unwrap();
        assert_eq!(json["emailSuccess"], true);
        assert_eq!(json["emailId"], "id-1");
        assert!(json.get("emailError").is_none());
    }

    #[test]
    fn test_from_delivery() {
        let server = ExportResult::from_delivery(Err(Error::EmailServer {
            status: 500,
            message: "SMTP down".into(),
        }));
        assert_eq!(server, ExportResult::failed("SMTP down"));

        let transport = ExportResult::from_delivery(Err(Error::EmailTransport("connection refused".into())));
        assert!(!transport.email_success);
        assert_eq!(transport.email_error.as_deref(), Some("connection refused"));

        assert_eq!(ExportResult::from_delivery(Ok(None)), ExportResult::sent(None));
    }
}
