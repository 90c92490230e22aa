//! Result types produced by a dispatch run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What kind of payload an artifact holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Processed PDF bytes, written as `<name>.processed.pdf`.
    ProcessedPdf,
    /// JSON result, written as `<name>.json`.
    Json,
}

impl ArtifactKind {
    /// Suffix appended to the original file name (extension included).
    pub fn suffix(self) -> &'static str {
        match self {
            ArtifactKind::ProcessedPdf => ".processed.pdf",
            ArtifactKind::Json => ".json",
        }
    }
}

/// The single file written for one successfully processed input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputArtifact {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub bytes_written: u64,
}

/// Terminal state of one candidate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Artifact written (input deleted unless cleanup failed).
    Succeeded,
    /// Error logged, input retained for the next run.
    Failed,
}

/// Everything recorded about one candidate file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    /// File name as found in the input directory.
    pub name: String,
    /// Full input path.
    pub input_path: PathBuf,
    pub status: FileStatus,
    /// Present only when `status == Succeeded`.
    pub artifact: Option<OutputArtifact>,
    /// Size of the payload sent to the service (0 when the read failed).
    pub bytes_read: u64,
    /// Attempts the OCR client needed for a success.
    pub attempts: u32,
    pub duration_ms: u64,
    /// True when the input file is still in the input directory afterwards.
    pub input_retained: bool,
    /// Error description when the file failed, or the cleanup warning
    /// when it succeeded but the input could not be deleted.
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.status == FileStatus::Succeeded
    }
}

/// Aggregate counters for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Candidate files (allow-listed regular files) found.
    pub discovered: usize,
    /// Directory entries skipped (wrong extension, not a regular file).
    pub ignored: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Successes whose input could not be deleted.
    pub cleanup_failures: usize,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub total_duration_ms: u64,
}

/// Report returned by [`crate::run`].
///
/// Purely informational: a run with failed files is still a completed run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// One entry per candidate, in processing order.
    pub files: Vec<FileOutcome>,
    pub stats: RunStats,
}

impl RunReport {
    /// Outcomes for files that failed.
    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| !f.is_success())
    }
}
