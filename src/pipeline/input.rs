//! Input resolution: turn a user-supplied path or URL into PDF bytes.
//!
//! The document goes to the model inline, so nothing needs to touch disk:
//! downloads are held in memory and local files are read whole. Both paths
//! check the `%PDF` magic bytes so a mistyped path to an HTML page fails
//! here with a clear message instead of as a confused model response.

use crate::error::ScheduleError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A document loaded from a path or URL.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    /// File name shown to the model (it often carries the cohort code).
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to PDF bytes plus a display filename.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, ScheduleError> {
    if input.trim().is_empty() {
        return Err(ScheduleError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input).await
    }
}

async fn resolve_local(path_str: &str) -> Result<ResolvedInput, ScheduleError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ScheduleError::FileNotFound { path });
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ScheduleError::PermissionDenied { path });
        }
        Err(source) => return Err(ScheduleError::FileRead { path, source }),
    };

    check_magic(&bytes, &path)?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());

    debug!("Resolved local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(ResolvedInput { filename, bytes })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, ScheduleError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ScheduleError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ScheduleError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ScheduleError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ScheduleError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ScheduleError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    let filename = filename_from_url(url);
    check_magic(&bytes, Path::new(&filename))?;

    info!("Downloaded {} bytes as '{}'", bytes.len(), filename);
    Ok(ResolvedInput { filename, bytes })
}

fn check_magic(bytes: &[u8], path: &Path) -> Result<(), ScheduleError> {
    if !bytes.starts_with(b"%PDF") {
        // Short files report what they have, zero-padded.
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(ScheduleError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

/// Last path segment of the URL if it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("https://school.example/edt/DEV101.pdf?v=2"),
            "DEV101.pdf"
        );
        assert_eq!(filename_from_url("https://school.example/edt/"), "downloaded.pdf");
        assert_eq!(filename_from_url("not a url"), "downloaded.pdf");
    }

    #[tokio::test]
    async fn local_pdf_resolves_with_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DEV101_S2.pdf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"%PDF-1.4\n%fake")
            .unwrap();

        let resolved = resolve_input(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(resolved.filename, "DEV101_S2.pdf");
        assert!(resolved.bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn non_pdf_rejected() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"<html>nope</html>").unwrap();

        let err = resolve_input(tmp.path().to_str().unwrap(), 5).await.unwrap_err();
        match err {
            ScheduleError::NotAPdf { magic, .. } => assert_eq!(&magic, b"<htm"),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn truncated_file_rejected() {
        for (content, expected) in [(&b""[..], [0u8; 4]), (&b"%PD"[..], *b"%PD\0")] {
            let mut tmp = tempfile::NamedTempFile::new().unwrap();
            tmp.write_all(content).unwrap();

            let err = resolve_input(tmp.path().to_str().unwrap(), 5).await.unwrap_err();
            match err {
                ScheduleError::NotAPdf { magic, .. } => assert_eq!(magic, expected),
                other => panic!("expected NotAPdf for {content:?}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = resolve_input("/definitely/not/a/real/file.pdf", 5)
            .await
            .unwrap_err();
        assert!(matches!(err, ScheduleError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn blank_input_is_invalid() {
        let err = resolve_input("   ", 5).await.unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidInput { .. }));
    }
}
