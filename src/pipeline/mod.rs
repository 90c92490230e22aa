//! Filesystem stages of a dispatch run.
//!
//! ## Data Flow
//!
//! ```text
//! discover ──▶ read ──▶ OcrClient::submit ──▶ persist ──▶ cleanup
//! (read_dir)   (bytes)   (HTTP, retries)      (artifact)   (delete input)
//! ```
//!
//! 1. [`discover`] — list the input directory in name order and keep
//!    regular files with an allow-listed extension
//! 2. [`persist`]  — map an [`crate::client::OcrResult`] to its artifact
//!    path and write it atomically
//!
//! Reading and deleting the input are single `tokio::fs` calls and live in
//! [`crate::dispatch`] next to the per-file error boundary.

pub mod discover;
pub mod persist;
