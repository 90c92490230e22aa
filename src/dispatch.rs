//! Batch processor: one sequential pass over the input directory.
//!
//! Each candidate file moves through
//! `Discovered → Read → Submitted → { Succeeded | Failed }`. Every error a
//! file can raise is caught at the per-file boundary in [`process_file`],
//! logged, and recorded in the [`RunReport`]; the loop then moves on. Only
//! problems that prevent the pass from starting at all (bad service URL,
//! unwritable output directory) surface as `Err(DispatchError)`.
//!
//! Everything a pass logs sits inside a `run` span, and everything logged
//! for one file (including the client's retry warnings) inside a
//! `file{name, index}` span beneath it.
//!
//! Files are handled strictly one at a time. The input is deleted only after
//! its artifact has been written; if the delete fails the file still counts
//! as succeeded and is simply picked up again by the next run.

use crate::client::OcrClient;
use crate::config::RunConfig;
use crate::error::{DispatchError, FileError};
use crate::output::{FileOutcome, FileStatus, OutputArtifact, RunReport, RunStats};
use crate::pipeline::discover::{self, CandidateFile};
use crate::pipeline::persist;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Drain `config.input_dir` once.
///
/// # Returns
/// `Ok(RunReport)` once every candidate was attempted, even if some of them
/// failed (check `report.stats.failed`). A missing input directory yields an
/// empty report.
///
/// # Errors
/// Returns `Err(DispatchError)` only for run-level problems:
/// - the service URL cannot be resolved or the HTTP client cannot be built
/// - the output directory cannot be created
/// - the input directory exists but cannot be listed
pub async fn run(config: &RunConfig) -> Result<RunReport, DispatchError> {
    let client = OcrClient::from_config(config)?;
    run_with_client(config, &client).await
}

/// Like [`run`], with a caller-supplied client.
pub async fn run_with_client(
    config: &RunConfig,
    client: &OcrClient,
) -> Result<RunReport, DispatchError> {
    let span = info_span!("run", input_dir = %config.input_dir.display());
    run_pass(config, client).instrument(span).await
}

async fn run_pass(config: &RunConfig, client: &OcrClient) -> Result<RunReport, DispatchError> {
    let total_start = Instant::now();
    info!(
        input_dir = %config.input_dir.display(),
        output_dir = %config.output_dir.display(),
        endpoint = %client.endpoint(),
        "Starting dispatch run"
    );

    // ── Step 1: Output directory ─────────────────────────────────────────
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|source| DispatchError::OutputDirFailed {
            path: config.output_dir.clone(),
            source,
        })?;

    // ── Step 2: Input directory ──────────────────────────────────────────
    if !input_dir_exists(&config.input_dir).await {
        warn!(
            "Input directory does not exist: {}",
            config.input_dir.display()
        );
        notify_start(config, 0);
        notify_complete(config, 0, 0);
        return Ok(RunReport::default());
    }

    // ── Step 3: Enumerate candidates ─────────────────────────────────────
    let discovery = discover::discover(&config.input_dir).await?;
    let total = discovery.candidates.len();
    info!(
        candidates = total,
        ignored = discovery.ignored,
        "Found {} file(s) to process",
        total
    );
    notify_start(config, total);

    // ── Step 4: Process sequentially ─────────────────────────────────────
    let mut files = Vec::with_capacity(total);
    for (i, candidate) in discovery.candidates.iter().enumerate() {
        let index = i + 1;
        let span = info_span!("file", name = %candidate.name, index);
        let outcome = process_file(client, config, candidate, index, total)
            .instrument(span)
            .await;
        files.push(outcome);
    }

    // ── Step 5: Summarise ────────────────────────────────────────────────
    let stats = summarise(&files, discovery.ignored, total_start);
    info!(
        succeeded = stats.succeeded,
        failed = stats.failed,
        cleanup_failures = stats.cleanup_failures,
        bytes_read = stats.bytes_read,
        bytes_written = stats.bytes_written,
        duration_ms = stats.total_duration_ms,
        "Run complete: {}/{} files processed",
        stats.succeeded,
        total
    );
    notify_complete(config, total, stats.succeeded);

    Ok(RunReport { files, stats })
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(config: &RunConfig) -> Result<RunReport, DispatchError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DispatchError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(config))
}

/// List the files a run would submit, without contacting the service.
pub async fn inspect(config: &RunConfig) -> Result<Vec<CandidateFile>, DispatchError> {
    if !input_dir_exists(&config.input_dir).await {
        warn!(
            "Input directory does not exist: {}",
            config.input_dir.display()
        );
        return Ok(Vec::new());
    }
    Ok(discover::discover(&config.input_dir).await?.candidates)
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn input_dir_exists(path: &Path) -> bool {
    matches!(tokio::fs::try_exists(path).await, Ok(true))
}

/// A file whose artifact has been written.
struct Processed {
    artifact: OutputArtifact,
    attempts: u32,
}

/// Process one candidate; never fails, the outcome records what happened.
async fn process_file(
    client: &OcrClient,
    config: &RunConfig,
    candidate: &CandidateFile,
    index: usize,
    total: usize,
) -> FileOutcome {
    let start = Instant::now();
    info!(file = %candidate.name, index, total, "Processing {}", candidate.name);
    if let Some(ref cb) = config.progress_callback {
        cb.on_file_start(&candidate.name, index, total);
    }

    let mut bytes_read = 0u64;
    let result = dispatch_file(client, &config.output_dir, candidate, &mut bytes_read).await;

    let mut outcome = FileOutcome {
        name: candidate.name.clone(),
        input_path: candidate.path.clone(),
        status: FileStatus::Failed,
        artifact: None,
        bytes_read,
        attempts: 0,
        duration_ms: 0,
        input_retained: true,
        error: None,
    };

    match result {
        Ok(processed) => {
            outcome.status = FileStatus::Succeeded;
            outcome.attempts = processed.attempts;

            match tokio::fs::remove_file(&candidate.path).await {
                Ok(()) => {
                    outcome.input_retained = false;
                    debug!("Deleted input {}", candidate.path.display());
                }
                Err(e) => {
                    warn!(
                        file = %candidate.name,
                        error = %e,
                        "Artifact written but input could not be deleted"
                    );
                    outcome.error = Some(format!("input not deleted: {e}"));
                }
            }

            outcome.duration_ms = start.elapsed().as_millis() as u64;
            info!(
                file = %candidate.name,
                artifact = %processed.artifact.path.display(),
                bytes_read,
                bytes_written = processed.artifact.bytes_written,
                attempts = processed.attempts,
                duration_ms = outcome.duration_ms,
                "Wrote output: {}",
                processed.artifact.path.display()
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_complete(&candidate.name, index, total, processed.artifact.bytes_written);
            }
            outcome.artifact = Some(processed.artifact);
        }
        Err(e) => {
            outcome.duration_ms = start.elapsed().as_millis() as u64;
            error!(
                file = %candidate.name,
                bytes_read,
                duration_ms = outcome.duration_ms,
                error = %e,
                "Failed to process {}",
                candidate.name
            );
            let message = e.to_string();
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_error(&candidate.name, index, total, &message);
            }
            outcome.error = Some(message);
        }
    }

    outcome
}

/// Read → submit → persist for one file.
async fn dispatch_file(
    client: &OcrClient,
    output_dir: &Path,
    candidate: &CandidateFile,
    bytes_read: &mut u64,
) -> Result<Processed, FileError> {
    let payload = tokio::fs::read(&candidate.path)
        .await
        .map_err(|source| FileError::ReadFailed {
            path: candidate.path.clone(),
            source,
        })?;
    *bytes_read = payload.len() as u64;

    let submission = client
        .submit_with_attempts(&candidate.name, &payload)
        .await
        .map_err(|source| FileError::Submit {
            file: candidate.name.clone(),
            source,
        })?;

    let artifact = persist::write_artifact(output_dir, &candidate.file_name, &submission.result).await?;

    Ok(Processed {
        artifact,
        attempts: submission.attempts,
    })
}

fn summarise(files: &[FileOutcome], ignored: usize, started: Instant) -> RunStats {
    let succeeded = files.iter().filter(|f| f.is_success()).count();
    RunStats {
        discovered: files.len(),
        ignored,
        succeeded,
        failed: files.len() - succeeded,
        cleanup_failures: files
            .iter()
            .filter(|f| f.is_success() && f.input_retained)
            .count(),
        bytes_read: files.iter().map(|f| f.bytes_read).sum(),
        bytes_written: files
            .iter()
            .filter_map(|f| f.artifact.as_ref())
            .map(|a| a.bytes_written)
            .sum(),
        total_duration_ms: started.elapsed().as_millis() as u64,
    }
}

fn notify_start(config: &RunConfig, total: usize) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total);
    }
}

fn notify_complete(config: &RunConfig, total: usize, succeeded: usize) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total, succeeded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ArtifactKind;
    use std::path::PathBuf;

    fn outcome(status: FileStatus, retained: bool, written: Option<u64>) -> FileOutcome {
        FileOutcome {
            name: "f.pdf".into(),
            input_path: PathBuf::from("/in/f.pdf"),
            status,
            artifact: written.map(|n| OutputArtifact {
                path: PathBuf::from("/out/f.pdf.json"),
                kind: ArtifactKind::Json,
                bytes_written: n,
            }),
            bytes_read: 10,
            attempts: 1,
            duration_ms: 5,
            input_retained: retained,
            error: None,
        }
    }

    #[test]
    fn summarise_counts_outcomes() {
        let files = vec![
            outcome(FileStatus::Succeeded, false, Some(100)),
            outcome(FileStatus::Succeeded, true, Some(50)),
            outcome(FileStatus::Failed, true, None),
        ];
        let stats = summarise(&files, 4, Instant::now());
        assert_eq!(stats.discovered, 3);
        assert_eq!(stats.ignored, 4);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.cleanup_failures, 1);
        assert_eq!(stats.bytes_read, 30);
        assert_eq!(stats.bytes_written, 150);
    }

    #[tokio::test]
    async fn missing_input_dir_is_empty_run() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = RunConfig::builder()
            .input_dir(dir.path().join("absent"))
            .output_dir(dir.path().join("out"))
            .service_url("http://127.0.0.1:9")
            .build()
            .unwrap();

        let report = run(&config).await.unwrap();
        assert!(report.files.is_empty());
        assert_eq!(report.stats, RunStats::default());
        // The output directory is still created.
        assert!(dir.path().join("out").is_dir());
    }

    #[test]
    fn run_sync_drives_a_pass_without_a_runtime() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = RunConfig::builder()
            .input_dir(dir.path().join("absent"))
            .output_dir(dir.path().join("out"))
            .service_url("http://127.0.0.1:9")
            .build()
            .unwrap();

        let report = run_sync(&config).unwrap();
        assert!(report.files.is_empty());
        assert!(dir.path().join("out").is_dir());
    }

    #[tokio::test]
    async fn inspect_lists_without_submitting() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"no").unwrap();
        let config = RunConfig::builder()
            .input_dir(dir.path())
            .build()
            .unwrap();

        let found = inspect(&config).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "a.pdf");
        assert!(dir.path().join("a.pdf").exists());
    }
}
