//! Extraction entry points.
//!
//! [`parse_schedule_pdf`] is the core operation: bytes and a filename in,
//! [`GroupData`] out. The other functions are conveniences around it for
//! paths, URLs, output files and synchronous callers.

use crate::config::ExtractionConfig;
use crate::error::ScheduleError;
use crate::pipeline::llm::{resolve_model, ExtractionRequest, ScheduleModel};
use crate::pipeline::{encode, input, normalize};
use crate::prompts::{extraction_prompt, response_schema};
use crate::schedule::GroupData;
use chrono::Utc;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Extract the timetable contained in one PDF.
///
/// # Arguments
/// * `bytes`    — raw PDF contents
/// * `filename` — original file name; the model uses it as a hint for the
///   cohort code
/// * `config`   — extraction configuration (model, credential, time slots)
///
/// # Errors
/// - Model failures (network, auth, quota) exactly as the model returned them
/// - [`ScheduleError::InvalidResponse`] / [`ScheduleError::InvalidEntry`]
///   when the JSON does not have the declared shape
///
/// A response that is not JSON at all is *not* an error: the result then has
/// no entries and status `OK`.
///
/// # Example
/// ```rust,no_run
/// use edgequake_timetable::{parse_schedule_pdf, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("DEV101.pdf")?;
/// let group = parse_schedule_pdf(&bytes, "DEV101.pdf", &ExtractionConfig::from_env()).await?;
/// println!("{}: {} classes", group.name, group.entries.len());
/// # Ok(())
/// # }
/// ```
pub async fn parse_schedule_pdf(
    bytes: &[u8],
    filename: &str,
    config: &ExtractionConfig,
) -> Result<GroupData, ScheduleError> {
    let model = resolve_model(config)?;
    extract_with_model(model.as_ref(), bytes, filename, config).await
}

/// Run the extraction against an explicit model.
pub async fn extract_with_model(
    model: &dyn ScheduleModel,
    bytes: &[u8],
    filename: &str,
    config: &ExtractionConfig,
) -> Result<GroupData, ScheduleError> {
    let start = Instant::now();
    info!("Extracting timetable from '{}' via {}", filename, model.name());

    // ── Step 1: Encode ───────────────────────────────────────────────────
    let document = encode::encode_pdf(bytes);

    // ── Step 2: Build request ────────────────────────────────────────────
    let request = ExtractionRequest {
        prompt: extraction_prompt(
            filename,
            &config.time_slots,
            config.prompt_template.as_deref(),
        ),
        document,
        response_schema: response_schema(),
        temperature: config.temperature,
        max_output_tokens: config.max_output_tokens,
    };

    // ── Step 3: Call the model ───────────────────────────────────────────
    let text = model.generate(&request).await?;
    debug!("Model returned {} chars", text.len());

    // ── Step 4: Decode & normalize ───────────────────────────────────────
    let raw = normalize::decode_or_empty(&text)?;
    let group = normalize::assemble(raw, Utc::now())?;

    info!(
        "Extracted {} entries for '{}' in {}ms",
        group.entries.len(),
        group.name,
        start.elapsed().as_millis()
    );
    Ok(group)
}

/// Extract from a local path or an HTTP/HTTPS URL.
pub async fn parse_schedule_file(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<GroupData, ScheduleError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    parse_schedule_pdf(&resolved.bytes, &resolved.filename, config).await
}

/// Extract and write the result as pretty JSON.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn parse_schedule_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<GroupData, ScheduleError> {
    let group = parse_schedule_file(input_str, config).await?;
    write_group_json(&group, output_path.as_ref()).await?;
    Ok(group)
}

/// Serialise `group` to `path` atomically.
pub async fn write_group_json(group: &GroupData, path: &Path) -> Result<(), ScheduleError> {
    let json = serde_json::to_string_pretty(group)
        .map_err(|e| ScheduleError::Internal(format!("serialise GroupData: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ScheduleError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json)
        .await
        .map_err(|e| ScheduleError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ScheduleError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Synchronous wrapper around [`parse_schedule_pdf`].
///
/// Creates a temporary tokio runtime internally; do not call from async code.
pub fn parse_schedule_sync(
    bytes: &[u8],
    filename: &str,
    config: &ExtractionConfig,
) -> Result<GroupData, ScheduleError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ScheduleError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(parse_schedule_pdf(bytes, filename, config))
}
