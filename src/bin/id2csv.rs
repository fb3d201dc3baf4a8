//! CLI binary for id2csv.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use id2csv::{
    extract_folder, BatchProgressCallback, ExtractionConfig, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
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

/// Terminal progress callback: a live progress bar plus one log line per
/// document.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_batch_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("Listing documents…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total_files as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting extraction of {total_files} documents…"))
        ));
    }

    fn on_file_start(&self, _file_num: usize, _total: usize, filename: &str) {
        self.bar.set_message(filename.to_string());
    }

    fn on_file_complete(&self, file_num: usize, total: usize, filename: &str, fields_found: usize) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<32}  {}",
            green("✓"),
            file_num,
            total,
            filename,
            dim(&format!("{fields_found:>2} fields")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, file_num: usize, total: usize, filename: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = truncate_error(error);

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<32}  {}",
            red("✗"),
            file_num,
            total,
            filename,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let failed = total_files.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} documents extracted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} documents extracted  ({} failed)",
                if failed == total_files {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

/// Shorten long error text to one display line.
///
/// Error messages embed the file name, which may be non-ASCII; the cut
/// point backs up to a character boundary so truncation never panics.
fn truncate_error(error: &str) -> String {
    const MAX_BYTES: usize = 80;
    if error.len() <= MAX_BYTES {
        return error.to_string();
    }
    let mut end = MAX_BYTES - 1;
    while !error.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\u{2026}", &error[..end])
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic batch extraction
  id2csv --input scans/ --output results.csv

  # A stronger model for worn or handwritten documents
  id2csv --input scans/ --output results.csv --model claude-sonnet-4-20250514

  # Custom extraction prompt
  id2csv --input scans/ --output results.csv --prompt my_prompt.txt

  # Structured JSON report on stdout (per-file errors, token usage)
  id2csv --input scans/ --output results.csv --json > report.json

SUPPORTED INPUT FILES:
  .png .jpg .jpeg .webp — decoded directly
  .pdf                  — first page rasterised via pdfium

OUTPUT CSV COLUMNS:
  filename, documentType, country, passportNumber, surname, givenName,
  dateOfBirth, gender, placeOfBirth, placeOfIssue, dateOfIssue, dateOfExpiry

  The CSV is rewritten after every processed document, so an interrupted
  run keeps everything extracted so far.

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY   Anthropic API key (required)

SETUP:
  1. Set API key:  export ANTHROPIC_API_KEY=sk-ant-...
  2. Extract:      id2csv --input scans/ --output results.csv
"#;

/// Batch-extract identity-document fields from images and PDFs into CSV.
#[derive(Parser, Debug)]
#[command(
    name = "id2csv",
    version,
    about = "Batch-extract identity-document fields from images and PDFs into CSV",
    long_about = "Send every supported document in a folder (PNG, JPEG, WebP, PDF) to a vision \
LLM for structured field extraction, and write the results to a fixed-schema CSV file. \
Failures are isolated per file: one corrupt scan never aborts the batch.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder containing the documents to process.
    #[arg(short, long, env = "ID2CSV_INPUT")]
    input: PathBuf,

    /// Path of the output CSV file.
    #[arg(short, long, env = "ID2CSV_OUTPUT")]
    output: PathBuf,

    /// Vision model ID.
    #[arg(long, env = "ID2CSV_MODEL", default_value = "claude-3-haiku-20240307")]
    model: String,

    /// Max model output tokens per document.
    #[arg(long, env = "ID2CSV_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Retries per document on API failure.
    #[arg(long, env = "ID2CSV_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Initial JPEG quality (1-100); stepped down until the image fits.
    #[arg(long, env = "ID2CSV_JPEG_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Maximum image dimension in pixels.
    #[arg(long, env = "ID2CSV_MAX_DIMENSION", default_value_t = 2000)]
    max_dimension: u32,

    /// Per-document API call timeout in seconds.
    #[arg(long, env = "ID2CSV_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long, env = "ID2CSV_PROMPT")]
    prompt: Option<PathBuf>,

    /// Print a structured JSON report (per-file results) to stdout.
    #[arg(long, env = "ID2CSV_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "ID2CSV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ID2CSV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "ID2CSV_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run extraction ───────────────────────────────────────────────────
    let output = extract_folder(&cli.input, &cli.output, &config)
        .await
        .context("Extraction failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    // Summary line (the callback already printed the per-file log).
    if !cli.quiet {
        eprintln!(
            "{}  {}/{} documents  {}ms  →  {}",
            if output.stats.failed_files == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            output.stats.processed_files,
            output.stats.total_files,
            output.stats.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&output.stats.total_input_tokens.to_string()),
            dim(&output.stats.total_output_tokens.to_string()),
        );
        if output.stats.failed_files > 0 && !show_progress {
            for result in output.results.iter().filter(|r| r.error.is_some()) {
                if let Some(ref e) = result.error {
                    eprintln!("   {} {}", red("✗"), e);
                }
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .model(&cli.model)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .jpeg_quality(cli.jpeg_quality)
        .max_dimension(cli.max_dimension)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref path) = cli.prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {path:?}"))?;
        builder = builder.prompt(prompt);
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::truncate_error;

    #[test]
    fn short_errors_pass_through() {
        assert_eq!(truncate_error("file not found"), "file not found");
    }

    #[test]
    fn long_errors_get_an_ellipsis() {
        let long = "x".repeat(200);
        let out = truncate_error(&long);
        assert_eq!(out, format!("{}\u{2026}", "x".repeat(79)));
    }

    #[test]
    fn multibyte_text_truncates_on_a_char_boundary() {
        // Two-byte chars put a boundary mid-character at byte 79.
        let accented = "é".repeat(50);
        let out = truncate_error(&accented);
        assert!(out.ends_with('\u{2026}'));
        assert!(out.len() < accented.len());
        // Every byte slice we produced is valid UTF-8 by construction;
        // the char count confirms no character was split.
        assert_eq!(out.chars().count(), 39 + 1);
    }
}
