//! # edgequake-ocr-dispatch
//!
//! Drain a directory of scanned documents through a remote OCR service.
//!
//! The crate owns no OCR logic. It discovers PDF and image files in an input
//! directory, uploads each one to the service's `process-pdf` endpoint,
//! stores whatever comes back (a processed PDF or a JSON result) in an output
//! directory, and deletes the input once its artifact is safely on disk.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input dir
//!  │
//!  ├─ 1. Discover  regular files with pdf/png/jpg/jpeg/tif/tiff/bmp extensions, name order
//!  ├─ 2. Read      whole file into memory
//!  ├─ 3. Submit    multipart POST, 3 attempts, 1 s / 2 s backoff
//!  ├─ 4. Persist   <name>.processed.pdf or <name>.json
//!  └─ 5. Cleanup   delete the input
//! ```
//!
//! A failing file is logged and left in place; the rest of the batch
//! carries on.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_ocr_dispatch::{run, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::builder()
//!         .input_dir("/data/in")
//!         .output_dir("/data/out")
//!         .service_url("http://ocr-service:8000")
//!         .build()?;
//!     let report = run(&config).await?;
//!     eprintln!("{} ok / {} failed", report.stats.succeeded, report.stats.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocr-dispatch` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{endpoint_url, OcrClient, OcrResult, Submission};
pub use config::{RetryPolicy, RunConfig, RunConfigBuilder};
pub use dispatch::{inspect, run, run_sync, run_with_client};
pub use error::{ClientError, DispatchError, FileError};
pub use output::{ArtifactKind, FileOutcome, FileStatus, OutputArtifact, RunReport, RunStats};
pub use pipeline::discover::{CandidateFile, SUPPORTED_EXTENSIONS};
pub use progress::{DispatchProgressCallback, NoopProgressCallback, ProgressCallback};
