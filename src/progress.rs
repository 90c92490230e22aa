//! Progress-callback trait for per-file dispatch events.
//!
//! Inject an [`Arc<dyn DispatchProgressCallback>`] via
//! [`crate::config::RunConfigBuilder::progress_callback`] to receive events
//! as the batch processor works through the input directory. The CLI uses it
//! to drive a terminal progress bar; a service embedding the library could
//! forward the same events to metrics or a status endpoint.
//!
//! # Example
//!
//! ```rust
//! use edgequake_ocr_dispatch::{DispatchProgressCallback, RunConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     written: AtomicUsize,
//! }
//!
//! impl DispatchProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, name: &str, _index: usize, _total: usize, bytes: u64) {
//!         self.written.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{name}: {bytes} bytes written");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { written: AtomicUsize::new(0) });
//!
//! let config = RunConfig::builder()
//!     .progress_callback(counter as Arc<dyn DispatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch processor as it handles each candidate file.
///
/// All methods default to no-ops so implementors only override what they
/// need. Indices are 1-based.
pub trait DispatchProgressCallback: Send + Sync {
    /// Called once after enumeration, before the first file is read.
    ///
    /// # Arguments
    /// * `total_files` — number of candidate files that will be attempted
    fn on_run_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called just before a file is read and submitted.
    fn on_file_start(&self, name: &str, index: usize, total_files: usize) {
        let _ = (name, index, total_files);
    }

    /// Called after the artifact for a file was written.
    ///
    /// # Arguments
    /// * `bytes_written` — size of the artifact on disk
    fn on_file_complete(&self, name: &str, index: usize, total_files: usize, bytes_written: u64) {
        let _ = (name, index, total_files, bytes_written);
    }

    /// Called when a file failed; its input stays in place.
    fn on_file_error(&self, name: &str, index: usize, total_files: usize, error: &str) {
        let _ = (name, index, total_files, error);
    }

    /// Called once after every candidate was attempted.
    ///
    /// # Arguments
    /// * `total_files`   — candidates attempted
    /// * `success_count` — candidates that produced an artifact
    fn on_run_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DispatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RunConfig`].
pub type ProgressCallback = Arc<dyn DispatchProgressCallback>;
