//! Error types for the edgequake-ocr-dispatch library.
//!
//! Three error types mirror the three scopes a failure can have:
//!
//! * [`DispatchError`] — **Fatal**: the run cannot start at all (bad
//!   configuration, output directory cannot be created). Returned as
//!   `Err(DispatchError)` from [`crate::run`].
//!
//! * [`FileError`] — **Per-file**: one input failed (unreadable, rejected by
//!   the service, artifact not writable). Caught at the batch boundary and
//!   recorded in [`crate::output::FileOutcome`]; the run continues.
//!
//! * [`ClientError`] — **Per-submission**: what the OCR client hands back
//!   after its retry budget is spent, or immediately for a non-retryable
//!   failure. Wrapped by [`FileError::Submit`].

use std::path::PathBuf;
use thiserror::Error;

/// Fatal, run-level errors.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configured OCR service URL cannot be turned into an endpoint.
    #[error("Invalid OCR service URL '{url}': {reason}")]
    InvalidServiceUrl { url: String, reason: String },

    /// The underlying HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    /// The output directory does not exist and could not be created.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input directory exists but could not be listed.
    #[error("Failed to list input directory '{path}': {source}")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of a single submission to the OCR service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, DNS, reset, or body-read failure.
    #[error("Request to '{url}' failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// No response within the per-request timeout.
    #[error("Request to '{url}' timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The service answered with a non-2xx status.
    #[error("OCR service at '{url}' returned HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },

    /// The service declared JSON but the body does not parse.
    #[error("OCR service at '{url}' returned malformed JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// A corrupt JSON body is a property of the service's reply, not of the
    /// network, so it ends the submission immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport { .. } | ClientError::Timeout { .. } | ClientError::Status { .. } => {
                true
            }
            ClientError::Decode { .. } => false,
        }
    }

    /// HTTP status code, when the failure was a rejected request.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure while processing one input file.
#[derive(Debug, Error)]
pub enum FileError {
    /// The input file could not be read into memory.
    #[error("Failed to read input '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The OCR service could not process the file.
    #[error("OCR submission failed for '{file}': {source}")]
    Submit {
        file: String,
        #[source]
        source: ClientError,
    },

    /// A structured result could not be serialised for the artifact.
    #[error("Failed to serialise JSON result for '{file}': {source}")]
    EncodeFailed {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    /// The output artifact could not be written.
    #[error("Failed to write artifact '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_is_retryable_and_reports_code() {
        let e = ClientError::Status {
            url: "http://ocr:8000/process-pdf".into(),
            status: 503,
            body: "busy".into(),
        };
        assert!(e.is_retryable());
        assert_eq!(e.status(), Some(503));
        assert!(e.to_string().contains("HTTP 503"), "got: {e}");
    }

    #[test]
    fn decode_error_is_not_retryable() {
        let source = serde_json::from_slice::<serde_json::Value>(b"{not json").unwrap_err();
        let e = ClientError::Decode {
            url: "http://ocr:8000/process-pdf".into(),
            source,
        };
        assert!(!e.is_retryable());
        assert_eq!(e.status(), None);
        assert!(e.to_string().contains("malformed JSON"));
    }

    #[test]
    fn timeout_display() {
        let e = ClientError::Timeout {
            url: "http://ocr:8000/process-pdf".into(),
            secs: 120,
        };
        assert!(e.is_retryable());
        assert!(e.to_string().contains("120s"));
    }

    #[test]
    fn file_error_keeps_submit_source() {
        let e = FileError::Submit {
            file: "scan3.pdf".into(),
            source: ClientError::Status {
                url: "u".into(),
                status: 500,
                body: String::new(),
            },
        };
        let msg = e.to_string();
        assert!(msg.contains("scan3.pdf"), "got: {msg}");
        let source = std::error::Error::source(&e).expect("source");
        assert!(source.to_string().contains("500"));
    }

    #[test]
    fn output_dir_failed_display() {
        let e = DispatchError::OutputDirFailed {
            path: PathBuf::from("/data/out"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.to_string().contains("/data/out"));
    }
}
