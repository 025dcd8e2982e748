//! CLI binary for doc-ocr.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `OcrConfig` / `OcrRequest` and emits the single artifact.

use anyhow::{Context, Result};
use clap::Parser;
use doc_ocr::{
    convert, save_artifact, ConversionProgressCallback, DocumentReference, OcrArtifact,
    OcrConfig, OcrRequest, OutputFormat, ProgressCallback, DEFAULT_BASE_URL,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::num::NonZeroUsize;
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

/// Terminal progress callback: one bar for the batch and one log line per
/// document. Documents finish out of order, so timings are keyed by index.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new(total: usize) -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.set_prefix("Recognising");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting OCR of {total_documents} documents…"))
        ));
    }

    fn on_document_start(&self, index: usize, _total: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(index, Instant::now());
        }
        self.bar.set_message(format!("file {index}"));
    }

    fn on_document_complete(&self, index: usize, total: usize, text_len: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} File {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            index,
            total,
            dim(&format!("{text_len:>6} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep long service bodies on one line.
        let msg: String = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} File {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} documents recognised",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} documents recognised  ({} failed)",
                if failed == total_documents {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_documents,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One image, inline JSON result on stdout
  doc-ocr --ocr-url http://ocr:8080/layout-parsing /files/scan.png

  # Several documents, PDFs split into 10-page slices
  doc-ocr --segmentation 10 /files/a.pdf /files/b.jpg /files/c.pdf

  # Write ocr_result.md instead of printing JSON
  doc-ocr --return-type file --output-dir out/ /files/report.pdf

  # Storage other than the default nginx sidecar
  doc-ocr --base-url https://files.example.com /uploads/contract.pdf

SUPPORTED TYPES:
  .pdf                      sent as fileType 0 (whole or per slice)
  .jpg .jpeg .png .bmp      sent as fileType 1

ENVIRONMENT VARIABLES:
  DOC_OCR_URL               Layout-parsing endpoint (required)
  DOC_OCR_BASE_URL          Storage base address (default http://nginx:80)
  DOC_OCR_SEGMENTATION      Pages per PDF slice
  DOC_OCR_RETURN_TYPE       text | file
  RUST_LOG                  Overrides the log filter
"#;

/// Recognise stored images and PDFs through a layout-parsing OCR service.
#[derive(Parser, Debug)]
#[command(
    name = "doc-ocr",
    version,
    about = "Batch OCR of stored images and PDFs through a layout-parsing service",
    long_about = "Fetch each document from storage, optionally split PDFs into page-range \
slices, send every unit to a layout-parsing OCR endpoint and join the Markdown in \
submission order. Failed documents appear inline as error lines.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Storage locations, appended to --base-url (e.g. /files/scan.png).
    #[arg(required = true)]
    documents: Vec<String>,

    /// Layout-parsing endpoint URL.
    #[arg(long, env = "DOC_OCR_URL")]
    ocr_url: String,

    /// Storage base address joined with each location.
    #[arg(long, env = "DOC_OCR_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Pages per PDF slice. Omit to send each PDF whole.
    #[arg(long, env = "DOC_OCR_SEGMENTATION")]
    segmentation: Option<NonZeroUsize>,

    /// Output selector: `text` prints JSON, anything else writes ocr_result.md.
    #[arg(long, env = "DOC_OCR_RETURN_TYPE", default_value = "text")]
    return_type: String,

    /// Directory for the file artifact.
    #[arg(short, long, env = "DOC_OCR_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Documents processed at once.
    #[arg(long, env = "DOC_OCR_DOCUMENT_CONCURRENCY", default_value_t = 4)]
    document_concurrency: usize,

    /// Slices of one PDF recognised at once.
    #[arg(long, env = "DOC_OCR_SLICE_CONCURRENCY", default_value_t = 3)]
    slice_concurrency: usize,

    /// Storage GET attempts per document.
    #[arg(long, env = "DOC_OCR_FETCH_ATTEMPTS", default_value_t = 3)]
    fetch_attempts: u32,

    /// Pause between storage attempts in milliseconds.
    #[arg(long, env = "DOC_OCR_RETRY_PAUSE_MS", default_value_t = 1000)]
    retry_pause_ms: u64,

    /// Storage request timeout in seconds.
    #[arg(long, env = "DOC_OCR_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// OCR request timeout in seconds.
    #[arg(long, env = "DOC_OCR_API_TIMEOUT", default_value_t = 300)]
    api_timeout: u64,

    /// Keep the service's Markdown exactly as returned.
    #[arg(long, env = "DOC_OCR_NO_NORMALIZE")]
    no_normalize: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOC_OCR_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC_OCR_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC_OCR_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build request and config ─────────────────────────────────────────
    let request = build_request(&cli);

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new(request.documents.len());
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let start = Instant::now();
    let artifact = convert(&request, &config)
        .await
        .context("OCR failed")?;

    match artifact {
        OcrArtifact::Text { .. } => {
            let json =
                serde_json::to_string_pretty(&artifact).context("Failed to serialise result")?;
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{json}").context("Failed to write to stdout")?;
        }
        OcrArtifact::File { .. } => {
            let path = save_artifact(&artifact, &cli.output_dir)
                .await
                .context("Failed to write artifact")?;
            if !cli.quiet {
                eprintln!(
                    "{}  {}ms  →  {}",
                    green("✔"),
                    start.elapsed().as_millis(),
                    bold(&path.display().to_string()),
                );
            }
        }
    }

    Ok(())
}

/// Map positional locations and output flags to an `OcrRequest`.
fn build_request(cli: &Cli) -> OcrRequest {
    let documents = cli
        .documents
        .iter()
        .map(|location| DocumentReference::new(location.as_str()))
        .collect();

    OcrRequest::new(documents)
        .segmentation(cli.segmentation.map(NonZeroUsize::get))
        .output_format(OutputFormat::from_selector(&cli.return_type))
}

/// Map CLI args to `OcrConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<OcrConfig> {
    let mut builder = OcrConfig::builder()
        .ocr_url(cli.ocr_url.clone())
        .base_url(cli.base_url.clone())
        .document_concurrency(cli.document_concurrency)
        .slice_concurrency(cli.slice_concurrency)
        .fetch_attempts(cli.fetch_attempts)
        .retry_pause_ms(cli.retry_pause_ms)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout)
        .normalize(!cli.no_normalize);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
