//! Document encoding: PDF bytes → base64 inline payload.
//!
//! Multimodal APIs take the document inline in the JSON body. The payload is
//! the bare base64 text; no `data:application/pdf;base64,` prefix, which
//! Gemini rejects in `inline_data`.

use crate::error::ScheduleError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use tracing::debug;

/// MIME type sent with every document.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A document ready to be attached to a model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfPayload {
    /// Standard base64 of the file contents.
    pub data: String,
    pub mime_type: &'static str,
    /// Size of the original file in bytes.
    pub byte_len: usize,
}

/// Encode in-memory PDF bytes.
pub fn encode_pdf(bytes: &[u8]) -> PdfPayload {
    let data = STANDARD.encode(bytes);
    debug!("Encoded document: {} bytes → {} bytes base64", bytes.len(), data.len());
    PdfPayload {
        data,
        mime_type: PDF_MIME_TYPE,
        byte_len: bytes.len(),
    }
}

/// Read and encode a file from disk.
pub async fn encode_file(path: &Path) -> Result<PdfPayload, ScheduleError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ScheduleError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(encode_pdf(&bytes))
}
