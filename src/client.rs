//! OCR service client: multipart upload, retry/backoff, response classification.
//!
//! One [`OcrClient`] is built per run and reused for every file, so the
//! underlying `reqwest::Client` can pool connections. Each
//! [`OcrClient::submit`] call is otherwise independent: no state is carried
//! from one file to the next.
//!
//! ## Retry Strategy
//!
//! Network failures and non-2xx statuses are treated as transient. After the
//! zero-indexed attempt `n` fails the client sleeps
//! `backoff_unit * backoff_base^n` (1 s, then 2 s with the defaults) and
//! tries again, up to `max_attempts` in total. A JSON body that does not
//! parse is never retried: the service answered, it just answered badly.
//!
//! ## Response Shape
//!
//! The `content-type` header alone decides the result variant. Anything
//! declaring `application/json` is parsed into [`OcrResult::Structured`];
//! every other body (including a missing header) is passed through as
//! [`OcrResult::Binary`] without inspection.

use crate::config::{RetryPolicy, RunConfig};
use crate::error::{ClientError, DispatchError};
use crate::output::ArtifactKind;
use reqwest::header::CONTENT_TYPE;
use reqwest::{multipart, Url};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Path segment of the processing endpoint, resolved against the base URL.
pub const ENDPOINT_SEGMENT: &str = "process-pdf";

/// Name of the multipart part carrying the document.
const FILE_PART: &str = "file";

/// Longest slice of an error response body kept in [`ClientError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 512;

/// The service's answer for one document.
#[derive(Debug, Clone, PartialEq)]
pub enum OcrResult {
    /// Processed PDF bytes, passed through verbatim.
    Binary(Vec<u8>),
    /// Parsed JSON result.
    Structured(serde_json::Value),
}

impl OcrResult {
    /// Artifact kind this result is persisted as.
    pub fn kind(&self) -> ArtifactKind {
        match self {
            OcrResult::Binary(_) => ArtifactKind::ProcessedPdf,
            OcrResult::Structured(_) => ArtifactKind::Json,
        }
    }
}

/// A successful submission together with the attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub result: OcrResult,
    pub attempts: u32,
}

/// Resolve the processing endpoint for a service base URL.
///
/// Trailing slashes are stripped, one is added back, and
/// [`ENDPOINT_SEGMENT`] is joined with standard relative-reference rules:
/// `http://ocr:8000` and `http://ocr:8000///` both give
/// `http://ocr:8000/process-pdf`, while `http://gw/ocr/` gives
/// `http://gw/ocr/process-pdf`.
pub fn endpoint_url(base_url: &str) -> Result<Url, DispatchError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let invalid = |reason: String| DispatchError::InvalidServiceUrl {
        url: base_url.to_string(),
        reason,
    };

    let base = Url::parse(&format!("{trimmed}/")).map_err(|e| invalid(e.to_string()))?;
    if base.cannot_be_a_base() {
        return Err(invalid("URL cannot be used as a base".into()));
    }
    base.join(ENDPOINT_SEGMENT).map_err(|e| invalid(e.to_string()))
}

/// Decide the result variant from the declared content type.
///
/// Media types are case-insensitive, so `Application/JSON; charset=utf-8`
/// still counts as JSON.
pub fn classify_response(content_type: &str, body: &[u8]) -> Result<OcrResult, serde_json::Error> {
    if content_type.to_ascii_lowercase().contains("application/json") {
        serde_json::from_slice(body).map(OcrResult::Structured)
    } else {
        Ok(OcrResult::Binary(body.to_vec()))
    }
}

/// HTTP client for the OCR service's `process-pdf` endpoint.
#[derive(Debug, Clone)]
pub struct OcrClient {
    http: reqwest::Client,
    endpoint: Url,
    retry: RetryPolicy,
    timeout: Duration,
}

impl OcrClient {
    /// Build a client for the service at `base_url`.
    pub fn new(base_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self, DispatchError> {
        let endpoint = endpoint_url(base_url)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            retry,
            timeout,
        })
    }

    /// Build a client from the service URL, timeout, and retry policy of a run.
    pub fn from_config(config: &RunConfig) -> Result<Self, DispatchError> {
        Self::new(&config.service_url, config.timeout(), config.retry)
    }

    /// The resolved `process-pdf` endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Submit one document and return the classified response.
    pub async fn submit(&self, filename: &str, payload: &[u8]) -> Result<OcrResult, ClientError> {
        self.submit_with_attempts(filename, payload)
            .await
            .map(|s| s.result)
    }

    /// Like [`submit`](Self::submit), also reporting how many attempts were used.
    pub async fn submit_with_attempts(
        &self,
        filename: &str,
        payload: &[u8],
    ) -> Result<Submission, ClientError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            match self.send_once(filename, payload, attempt + 1).await {
                Ok(result) => {
                    return Ok(Submission {
                        result,
                        attempts: attempt + 1,
                    })
                }
                Err(e) if !e.is_retryable() => {
                    error!(file = filename, error = %e, "OCR response rejected, not retrying");
                    return Err(e);
                }
                Err(e) if attempt + 1 >= max_attempts => {
                    error!(
                        file = filename,
                        attempts = max_attempts,
                        error = %e,
                        "Final OCR attempt failed"
                    );
                    return Err(e);
                }
                Err(e) => {
                    let backoff = self.retry.delay_for(attempt);
                    warn!(
                        file = filename,
                        attempt = attempt + 1,
                        max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "OCR request failed, retrying"
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    /// One POST, no retries.
    async fn send_once(
        &self,
        filename: &str,
        payload: &[u8],
        attempt: u32,
    ) -> Result<OcrResult, ClientError> {
        debug!(
            url = %self.endpoint,
            attempt,
            file = filename,
            bytes = payload.len(),
            "POST"
        );

        let part = multipart::Part::bytes(payload.to_vec()).file_name(filename.to_string());
        let form = multipart::Form::new().part(FILE_PART, part);

        let start = Instant::now();
        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        info!(
            url = %self.endpoint,
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "OCR response"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                url: self.endpoint.to_string(),
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        debug!(
            content_type = %content_type,
            content_length = body.len(),
            "OCR response body received"
        );

        classify_response(&content_type, &body).map_err(|source| ClientError::Decode {
            url: self.endpoint.to_string(),
            source,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout {
                url: self.endpoint.to_string(),
                secs: self.timeout.as_secs(),
            }
        } else {
            ClientError::Transport {
                url: self.endpoint.to_string(),
                source: e,
            }
        }
    }
}

fn truncate_body(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() > MAX_ERROR_BODY_CHARS {
        let mut s: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        s.push('\u{2026}');
        s
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_from_bare_host() {
        let url = endpoint_url("http://ocr-service:8000").unwrap();
        assert_eq!(url.as_str(), "http://ocr-service:8000/process-pdf");
    }

    #[test]
    fn endpoint_strips_trailing_slashes() {
        let url = endpoint_url("http://ocr-service:8000///").unwrap();
        assert_eq!(url.as_str(), "http://ocr-service:8000/process-pdf");
    }

    #[test]
    fn endpoint_keeps_path_prefix() {
        let url = endpoint_url("https://gateway.local/ocr/v1/").unwrap();
        assert_eq!(url.as_str(), "https://gateway.local/ocr/v1/process-pdf");
        let url = endpoint_url("https://gateway.local/ocr/v1").unwrap();
        assert_eq!(url.as_str(), "https://gateway.local/ocr/v1/process-pdf");
    }

    #[test]
    fn endpoint_rejects_garbage() {
        assert!(matches!(
            endpoint_url("not a url"),
            Err(DispatchError::InvalidServiceUrl { .. })
        ));
    }

    #[test]
    fn classify_json() {
        let r = classify_response("application/json", br#"{"text": "hello"}"#).unwrap();
        assert_eq!(r, OcrResult::Structured(json!({"text": "hello"})));
        assert_eq!(r.kind(), ArtifactKind::Json);
    }

    #[test]
    fn classify_json_with_charset_and_case() {
        let r = classify_response("Application/JSON; charset=utf-8", b"[1, 2]").unwrap();
        assert_eq!(r, OcrResult::Structured(json!([1, 2])));
    }

    #[test]
    fn classify_pdf_is_verbatim() {
        let bytes = b"%PDF-1.7\n\x00\xff binary".to_vec();
        let r = classify_response("application/pdf", &bytes).unwrap();
        assert_eq!(r, OcrResult::Binary(bytes));
        assert_eq!(r.kind(), ArtifactKind::ProcessedPdf);
    }

    #[test]
    fn classify_missing_content_type_is_binary() {
        let r = classify_response("", b"{\"looks\": \"like json\"}").unwrap();
        assert!(matches!(r, OcrResult::Binary(_)));
    }

    #[test]
    fn classify_malformed_json_fails() {
        assert!(classify_response("application/json", b"{\"text\": ").is_err());
    }

    #[test]
    fn truncate_long_body() {
        let long = "x".repeat(2000);
        let t = truncate_body(&long);
        assert_eq!(t.chars().count(), MAX_ERROR_BODY_CHARS + 1);
        assert_eq!(truncate_body("  short  "), "short");
    }

    #[test]
    fn client_uses_config_endpoint() {
        let config = RunConfig::builder()
            .service_url("http://localhost:9000/")
            .build()
            .unwrap();
        let client = OcrClient::from_config(&config).unwrap();
        assert_eq!(client.endpoint().as_str(), "http://localhost:9000/process-pdf");
    }
}
