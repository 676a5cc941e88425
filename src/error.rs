//! Error types for the fieldpdf export pipeline.

use std::io;
use thiserror::Error;

/// Result type alias for fieldpdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while exporting a document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The named export root does not exist in the page.
    #[error("Export target not found: {0}")]
    CaptureTargetMissing(String),

    /// Segmentation, table extraction or page composition failed.
    #[error("Rendering error: {0}")]
    Render(String),

    /// The raster backend failed to capture a segment.
    #[error("Rasterization error: {0}")]
    Rasterize(String),

    /// Error building the PDF object graph.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Error decoding or encoding raster data.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Network failure while talking to the mail relay.
    #[error("Email transport error: {0}")]
    EmailTransport(String),

    /// The mail relay answered with a non-success status.
    #[error("Email server error ({status}): {message}")]
    EmailServer {
        /// HTTP status code
        status: u16,
        /// Best available message from the response
        message: String,
    },

    /// Record store failure (remote and cache both unavailable).
    #[error("Record store error: {0}")]
    Store(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::EmailTransport(err.to_string())
    }
}

impl Error {
    /// Whether this error aborts the whole export (no document saved).
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::EmailTransport(_) | Error::EmailServer { .. } | Error::Store(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CaptureTargetMissing("report-root".into());
        assert_eq!(err.to_string(), "Export target not found: report-root");

        let err = Error::EmailServer {
            status: 500,
            message: "mailbox full".into(),
        };
        assert_eq!(err.to_string(), "Email server error (500): mailbox full");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::Render("boom".into()).is_fatal());
        assert!(Error::CaptureTargetMissing("x".into()).is_fatal());
        assert!(!Error::EmailTransport("offline".into()).is_fatal());
    }
}
