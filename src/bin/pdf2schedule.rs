//! CLI binary for edgequake-timetable.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints the extracted timetable as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_timetable::extract::write_group_json;
use edgequake_timetable::{parse_schedule_file, ExtractionConfig, GroupData};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract to stdout
  pdf2schedule DEV101.pdf

  # Write JSON to a file
  pdf2schedule DEV101.pdf -o dev101.json

  # Custom time grid
  pdf2schedule --time-slots "08:30-10:00,10:15-11:45,13:30-15:00" DEV101.pdf

  # From a URL, through another provider
  pdf2schedule --provider openai --model gpt-4.1 https://school.example/edt/DEV101.pdf

OUTPUT:
  {
    "name": "DEV101",
    "lastUpdated": 1729332000000,
    "entries": [
      { "groupName": "DEV101", "day": "Lundi", "timeSlot": "08:00-10:00",
        "room": "A1", "professor": "M. Alami" }
    ],
    "status": "OK",
    "mondaySummary": []
  }

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Gemini API key (native client)
  OPENAI_API_KEY          OpenAI API key (with --provider openai)
  ANTHROPIC_API_KEY       Anthropic API key (with --provider anthropic)
  TIMETABLE_MODEL         Override model ID
  TIMETABLE_PROVIDER      Override provider
"#;

/// Extract class timetables from PDF files using generative models.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2schedule",
    version,
    about = "Extract class timetables from PDF files as JSON",
    long_about = "Send a timetable PDF (local file or URL) to a multimodal model with a JSON \
schema and print the normalised schedule: canonical cohort code, weekday, time slot, room and \
professor for every class. Uses Gemini natively; other providers go through edgequake-llm.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write JSON to this file instead of stdout.
    #[arg(short, long, env = "TIMETABLE_OUTPUT")]
    output: Option<PathBuf>,

    /// Model ID (e.g. gemini-1.5-flash, gemini-1.5-pro).
    #[arg(long, env = "TIMETABLE_MODEL", default_value = edgequake_timetable::config::DEFAULT_MODEL)]
    model: String,

    /// Provider: gemini (native), or any edgequake-llm provider name.
    #[arg(long, env = "TIMETABLE_PROVIDER")]
    provider: Option<String>,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini API base URL (for proxies).
    #[arg(long, env = "TIMETABLE_API_BASE_URL")]
    api_base_url: Option<String>,

    /// Comma-separated allowed time slots.
    #[arg(long, env = "TIMETABLE_TIME_SLOTS", value_delimiter = ',')]
    time_slots: Vec<String>,

    /// Path to a text file with a custom prompt ({filename}, {time_slots} placeholders).
    #[arg(long, env = "TIMETABLE_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "TIMETABLE_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max output tokens for the response.
    #[arg(long, env = "TIMETABLE_MAX_OUTPUT_TOKENS", default_value_t = 8192)]
    max_output_tokens: usize,

    /// Timeout for the model call in seconds (none by default).
    #[arg(long, env = "TIMETABLE_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "TIMETABLE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print single-line JSON.
    #[arg(long)]
    compact: bool,

    /// Disable the spinner.
    #[arg(long, env = "TIMETABLE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "TIMETABLE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "TIMETABLE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.verbose;
    let filter = default_log_filter(cli.verbose, cli.quiet, show_progress);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).await?;

    let spinner = show_progress.then(|| new_spinner(&cli.input));
    let start = Instant::now();

    let result = match cli.output {
        Some(ref path) => {
            let group = parse_schedule_file(&cli.input, &config)
                .await
                .context("Extraction failed");
            match group {
                Ok(group) => write_group_json(&group, path)
                    .await
                    .context("Failed to write output")
                    .map(|_| group),
                Err(e) => Err(e),
            }
        }
        None => parse_schedule_file(&cli.input, &config)
            .await
            .context("Extraction failed"),
    };

    if let Some(ref bar) = spinner {
        bar.finish_and_clear();
    }
    let group = result?;

    if cli.output.is_none() {
        print_json(&group, cli.compact)?;
    }

    if !cli.quiet {
        let target = cli
            .output
            .as_ref()
            .map(|p| format!("  →  {}", bold(&p.display().to_string())))
            .unwrap_or_default();
        eprintln!(
            "{} {}  {} entries  {}{}",
            green("✔"),
            bold(&group.name),
            group.entries.len(),
            dim(&format!("{}ms", start.elapsed().as_millis())),
            target,
        );
    }

    Ok(())
}

fn new_spinner(input: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("Extracting");
    bar.set_message(cyan(input));
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn print_json(group: &GroupData, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(group)
    } else {
        serde_json::to_string_pretty(group)
    }
    .context("Failed to serialise output")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{json}").context("Failed to write to stdout")?;
    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .model(cli.model.clone())
        .temperature(cli.temperature)
        .max_output_tokens(cli.max_output_tokens)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref url) = cli.api_base_url {
        builder = builder.api_base_url(url.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }

    let slots = parse_time_slots(&cli.time_slots);
    if !slots.is_empty() {
        builder = builder.time_slots(slots);
    }

    if let Some(ref path) = cli.prompt_file {
        let template = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt_template(template);
    }

    builder.build().context("Invalid configuration")
}

/// Level used when `RUST_LOG` is unset.
///
/// The spinner hides `info` chatter but warnings (e.g. a missing API key)
/// still reach stderr; indicatif redraws around them.
fn default_log_filter(verbose: bool, quiet: bool, show_progress: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    }
}

/// Trim `--time-slots` values and drop empty ones (e.g. from a trailing comma).
fn parse_time_slots(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
