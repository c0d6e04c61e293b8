//! Error types for the edgequake-timetable library.
//!
//! Every failure is a [`ScheduleError`]. The variants are grouped by the
//! stage that produces them so callers can match on the family they care
//! about (bad input, credential, remote service, response shape) without
//! string inspection.
//!
//! One variant is special: [`ScheduleError::MalformedResponse`] is produced
//! by the response decoder but the extraction pipeline catches it and
//! substitutes an empty schedule. It only reaches callers that use
//! [`crate::pipeline::normalize::decode_response`] directly.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-timetable library.
#[derive(Debug, Error)]
pub enum ScheduleError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but reading its contents failed.
    #[error("Failed to read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Credential errors ─────────────────────────────────────────────────
    /// No API credential was configured.
    ///
    /// Only the strict constructors return this. The lenient path logs a
    /// warning and lets the first request fail with [`ScheduleError::AuthError`].
    #[error("API credential missing.\nSet {var} or pass --api-key.")]
    CredentialMissing { var: String },

    // ── Service errors ────────────────────────────────────────────────────
    /// The configured provider could not be constructed.
    #[error("Model provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Network, quota or model failure reported by the generative API.
    #[error("Model API error from '{provider}': {message}")]
    ExternalService { provider: String, message: String },

    /// The API rejected the credential (401/403).
    #[error("Authentication error from provider '{provider}': {detail}")]
    AuthError { provider: String, detail: String },

    /// The API returned HTTP 429.
    #[error("Rate limit exceeded for provider '{provider}'")]
    RateLimitExceeded {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    // ── Response errors ───────────────────────────────────────────────────
    /// The response text is not JSON at all.
    #[error("Model response is not valid JSON: {detail}")]
    MalformedResponse { detail: String },

    /// The response is JSON but does not have the declared shape.
    #[error("Model response does not match the schedule schema: {detail}")]
    InvalidResponse { detail: String },

    /// An extracted entry is missing a required field.
    #[error("Schedule entry #{index} is missing required field '{field}'")]
    InvalidEntry { index: usize, field: &'static str },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScheduleError {
    /// `true` for failures reported by (or on the way to) the remote model.
    pub fn is_service_error(&self) -> bool {
        matches!(
            self,
            ScheduleError::ExternalService { .. }
                | ScheduleError::AuthError { .. }
                | ScheduleError::RateLimitExceeded { .. }
        )
    }
}
