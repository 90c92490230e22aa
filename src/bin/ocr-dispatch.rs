//! CLI binary for edgequake-ocr-dispatch.
//!
//! A thin shim over the library crate that maps flags and environment
//! variables to `RunConfig`, runs one pass, and prints a summary.
//!
//! The exit code is 0 whenever the pass completes, however many files
//! failed; failures are reported in the log (and in `--json` output).

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_ocr_dispatch::{
    inspect, run, DispatchProgressCallback, ProgressCallback, RunConfig, RunReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch plus a line per file.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the file currently being processed.
    current: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("Listing input directory…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            current: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.current
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl DispatchProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_files: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total_files as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Dispatching");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{total_files} file(s) queued for OCR"))
        ));
    }

    fn on_file_start(&self, name: &str, _index: usize, _total: usize) {
        if let Ok(mut t) = self.current.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_file_complete(&self, name: &str, index: usize, total: usize, bytes_written: u64) {
        let secs = self.elapsed_secs();
        self.bar.println(format!(
            "  {} {:>3}/{:<3} {}  {}  {}",
            green("✓"),
            index,
            total,
            name,
            dim(&format!("{bytes_written} bytes")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, name: &str, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs();
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep the line readable; the full error is in the log.
        let msg: String = if error.chars().count() > 80 {
            let mut s: String = error.chars().take(79).collect();
            s.push('\u{2026}');
            s
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3} {}  {}  {}",
            red("✗"),
            index,
            total,
            name,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_files: usize, success_count: usize) {
        let failed = total_files.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if total_files == 0 {
            eprintln!("{} nothing to process", dim("·"));
        } else if failed == 0 {
            eprintln!(
                "{} {} file(s) processed successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} file(s) processed  ({} failed, inputs kept)",
                if failed == total_files {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_files,
                red(&self.errors.load(Ordering::SeqCst).to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One pass with the container defaults (/data/in → /data/out)
  ocr-dispatch

  # Explicit directories and service
  ocr-dispatch --input-dir ./scans --output-dir ./ocr --service-url http://localhost:8000

  # See what would be submitted
  ocr-dispatch --list-only --input-dir ./scans

  # Machine-readable run report
  ocr-dispatch --json > report.json

OUTPUT:
  <name>.processed.pdf   service answered with a PDF (any non-JSON content type)
  <name>.json            service answered with application/json (pretty-printed)

  Inputs are deleted after their artifact is written. Failed inputs stay in
  place and are retried on the next run. The exit code is 0 even when some
  files fail.

ENVIRONMENT VARIABLES:
  INPUT_DIR         Directory to drain (default /data/in)
  OUTPUT_DIR        Directory for artifacts (default /data/out)
  OCR_SERVICE_URL   Base URL of the OCR service (default http://ocr-service:8000)
  LOG_LEVEL         Log verbosity: error, warn, info, debug, trace (default info)
  RUST_LOG          Full tracing filter; overrides LOG_LEVEL
"#;

/// Submit every scanned document in a directory to an OCR service.
#[derive(Parser, Debug)]
#[command(
    name = "ocr-dispatch",
    version,
    about = "Submit every scanned document in a directory to an OCR service",
    long_about = "Drain a directory of PDF and image files (pdf, png, jpg, jpeg, tif, tiff, bmp) \
through a remote OCR service's /process-pdf endpoint, writing each response to an output \
directory and deleting inputs that were processed successfully.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory of documents to submit.
    #[arg(long, env = "INPUT_DIR", default_value = "/data/in")]
    input_dir: PathBuf,

    /// Directory artifacts are written to (created if missing).
    #[arg(long, env = "OUTPUT_DIR", default_value = "/data/out")]
    output_dir: PathBuf,

    /// Base URL of the OCR service.
    #[arg(long, env = "OCR_SERVICE_URL", default_value = "http://ocr-service:8000")]
    service_url: String,

    /// Log verbosity (error, warn, info, debug, trace) [default: info].
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "OCR_TIMEOUT_SECS", default_value_t = 120)]
    timeout: u64,

    /// Attempts per file, including the first.
    #[arg(long, env = "OCR_MAX_ATTEMPTS", default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: u32,

    /// Wait before the second attempt in milliseconds; doubles after each failure.
    #[arg(long, env = "OCR_BACKOFF_MS", default_value_t = 1000)]
    backoff_ms: u64,

    /// Print the files that would be submitted, then exit.
    #[arg(long)]
    list_only: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "OCR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar only appears on an interactive terminal; in that case
    // INFO-level library logs would just scroll it away.
    let show_progress =
        !cli.quiet && !cli.no_progress && !cli.json && !cli.list_only && io::stderr().is_terminal();
    let filter = log_filter(&cli, show_progress);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&filter))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn DispatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── List-only mode ───────────────────────────────────────────────────
    if cli.list_only {
        let candidates = inspect(&config)
            .await
            .context("Failed to list input directory")?;
        if cli.json {
            let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&names).context("Failed to serialize file list")?
            );
        } else {
            for c in &candidates {
                println!("{}", c.path.display());
            }
            if !cli.quiet {
                eprintln!("{} file(s) eligible", candidates.len());
            }
        }
        return Ok(());
    }

    // ── Run one pass ─────────────────────────────────────────────────────
    let report = run(&config).await.context("Dispatch run failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet && !show_progress {
        print_summary(&report);
    }

    Ok(())
}

/// Filter directive used when `RUST_LOG` is not set.
///
/// An explicit `--log-level`/`LOG_LEVEL` wins over the progress bar's quiet
/// default; `--verbose` and `--quiet` win over both.
fn log_filter(cli: &Cli, show_progress: bool) -> String {
    if cli.verbose {
        "debug".to_string()
    } else if cli.quiet {
        "error".to_string()
    } else if let Some(level) = &cli.log_level {
        level.clone()
    } else if show_progress {
        "error".to_string()
    } else {
        "info".to_string()
    }
}

/// Map CLI args to `RunConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<RunConfig> {
    let mut builder = RunConfig::builder()
        .input_dir(&cli.input_dir)
        .output_dir(&cli.output_dir)
        .service_url(cli.service_url.clone())
        .timeout_secs(cli.timeout)
        .max_attempts(cli.max_attempts)
        .backoff_unit(Duration::from_millis(cli.backoff_ms));

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(report: &RunReport) {
    let s = &report.stats;
    eprintln!(
        "{}  {}/{} files  {}ms  ({} ignored)",
        if s.failed == 0 { green("✔") } else { cyan("⚠") },
        s.succeeded,
        s.discovered,
        s.total_duration_ms,
        s.ignored,
    );
    for f in report.failures() {
        eprintln!(
            "   {} {}  {}",
            red("✗"),
            f.name,
            dim(f.error.as_deref().unwrap_or("unknown error"))
        );
    }
    if s.cleanup_failures > 0 {
        eprintln!(
            "   {} input(s) processed but not deleted",
            s.cleanup_failures
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["ocr-dispatch"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn progress_bar_quiets_logs_by_default() {
        let c = Cli {
            log_level: None,
            ..cli(&[])
        };
        assert_eq!(log_filter(&c, true), "error");
        assert_eq!(log_filter(&c, false), "info");
    }

    #[test]
    fn explicit_level_survives_progress_bar() {
        let c = Cli {
            log_level: Some("debug".into()),
            ..cli(&[])
        };
        assert_eq!(log_filter(&c, true), "debug");
        assert_eq!(log_filter(&c, false), "debug");
    }

    #[test]
    fn verbose_and_quiet_override_level() {
        let c = Cli {
            log_level: Some("warn".into()),
            ..cli(&["--verbose"])
        };
        assert_eq!(log_filter(&c, true), "debug");

        let c = Cli {
            log_level: Some("warn".into()),
            ..cli(&["--quiet"])
        };
        assert_eq!(log_filter(&c, false), "error");
    }
}
