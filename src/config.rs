//! Configuration types for a dispatch run.
//!
//! Everything a run needs lives in [`RunConfig`], built through
//! [`RunConfigBuilder`]. The config is constructed once at startup and never
//! mutated while the run is in progress.

use crate::error::DispatchError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default directory drained by the worker.
pub const DEFAULT_INPUT_DIR: &str = "/data/in";

/// Default directory artifacts are written to.
pub const DEFAULT_OUTPUT_DIR: &str = "/data/out";

/// Default base URL of the OCR service.
pub const DEFAULT_SERVICE_URL: &str = "http://ocr-service:8000";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for one pass over the input directory.
///
/// # Example
/// ```rust
/// use edgequake_ocr_dispatch::RunConfig;
///
/// let config = RunConfig::builder()
///     .input_dir("/srv/scans/in")
///     .output_dir("/srv/scans/out")
///     .service_url("http://localhost:8000")
///     .build()
///     .unwrap();
/// assert_eq!(config.retry.max_attempts, 3);
/// ```
#[derive(Clone)]
pub struct RunConfig {
    /// Directory scanned for candidate files. Default: `/data/in`.
    pub input_dir: PathBuf,

    /// Directory artifacts are written to; created when missing. Default: `/data/out`.
    pub output_dir: PathBuf,

    /// Base URL of the OCR service. Default: `http://ocr-service:8000`.
    ///
    /// The `process-pdf` endpoint is resolved relative to it, so a path
    /// prefix such as `http://gateway/ocr/` is kept.
    pub service_url: String,

    /// Per-attempt HTTP timeout in seconds. Default: 120.
    ///
    /// Large multi-page scans can take the service a minute or more.
    pub timeout_secs: u64,

    /// Retry and backoff parameters for each submission.
    pub retry: RetryPolicy,

    /// Optional progress observer notified as files are processed.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            service_url: DEFAULT_SERVICE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("service_url", &self.service_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn DispatchProgressCallback>"),
            )
            .finish()
    }
}

impl RunConfig {
    /// Create a new builder for `RunConfig`.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder {
            config: Self::default(),
        }
    }

    /// Per-attempt timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Bounded exponential backoff.
///
/// After the zero-indexed attempt `n` fails, the client waits
/// `backoff_unit * backoff_base^n` before attempt `n + 1`. The defaults give
/// 1 s then 2 s across three attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Default: 3.
    pub max_attempts: u32,
    /// Growth factor between consecutive waits. Default: 2.
    pub backoff_base: u32,
    /// Wait before the second attempt. Default: 1 s.
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: 2,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after the zero-indexed `attempt` failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_base.saturating_pow(attempt);
        self.backoff_unit.saturating_mul(factor)
    }

    /// Sum of all waits when every attempt fails.
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1))
            .map(|a| self.delay_for(a))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn service_url(mut self, url: impl Into<String>) -> Self {
        self.config.service_url = url.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.retry.max_attempts = n;
        self
    }

    pub fn backoff_base(mut self, base: u32) -> Self {
        self.config.retry.backoff_base = base;
        self
    }

    pub fn backoff_unit(mut self, unit: Duration) -> Self {
        self.config.retry.backoff_unit = unit;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunConfig, DispatchError> {
        let c = &self.config;
        let url = c.service_url.trim();
        if url.is_empty() {
            return Err(DispatchError::InvalidConfig(
                "OCR service URL must not be empty".into(),
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(DispatchError::InvalidConfig(format!(
                "OCR service URL must use http or https, got '{url}'"
            )));
        }
        if c.retry.max_attempts == 0 {
            return Err(DispatchError::InvalidConfig(
                "Max attempts must be ≥ 1".into(),
            ));
        }
        if c.timeout_secs == 0 {
            return Err(DispatchError::InvalidConfig(
                "Timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}
