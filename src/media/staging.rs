//! Stage byte and base64 overlay payloads as temporary files so external decoders can open them.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context as _;
use base64::Engine as _;

use crate::foundation::error::{ComposeError, ComposeResult};
use crate::model::request::OverlaySource;

const DATA_URL_PREFIX: &str = "data:";

static STAGE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A temporary file removed when revoked or dropped.
#[derive(Debug)]
pub(crate) struct TempFileGuard(Option<PathBuf>);

impl TempFileGuard {
    /// Guard a file created at `path`.
    pub(crate) fn new(path: PathBuf) -> Self {
        Self(Some(path))
    }

    /// Delete the file now. Later calls are no-ops.
    pub(crate) fn revoke(&mut self) {
        if let Some(path) = self.0.take() {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "removed temporary file"),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove temporary file")
                }
            }
        }
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        self.revoke();
    }
}

/// Overlay source resolved to a local path.
#[derive(Debug)]
pub(crate) struct StagedOverlay {
    path: PathBuf,
    temp: TempFileGuard,
}

impl StagedOverlay {
    /// Caller-owned `path` used as is, without the existence check.
    #[cfg(test)]
    pub(crate) fn borrowed(path: PathBuf) -> Self {
        Self {
            path,
            temp: TempFileGuard(None),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the staged copy, if any. Caller-owned paths are never touched.
    pub(crate) fn revoke(&mut self) {
        self.temp.revoke();
    }

    pub(crate) fn is_temporary(&self) -> bool {
        self.temp.0.is_some()
    }
}

/// Resolve `source` to a readable path, writing bytes and base64 payloads to a temp file.
pub(crate) fn stage_overlay(source: &OverlaySource) -> ComposeResult<StagedOverlay> {
    match source {
        OverlaySource::Path(path) => {
            if !path.is_file() {
                return Err(ComposeError::decode(format!(
                    "overlay video '{}' does not exist",
                    path.display()
                )));
            }
            Ok(StagedOverlay {
                path: path.clone(),
                temp: TempFileGuard(None),
            })
        }
        OverlaySource::Bytes { data, extension } => write_temp(data, extension),
        OverlaySource::Base64(payload) => {
            let (bytes, ext) = decode_payload(payload)?;
            write_temp(&bytes, ext)
        }
    }
}

fn write_temp(bytes: &[u8], extension: &str) -> ComposeResult<StagedOverlay> {
    if bytes.is_empty() {
        return Err(ComposeError::decode("overlay video payload is empty"));
    }
    let ext: String = extension
        .trim_start_matches('.')
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(8)
        .collect();
    let ext = if ext.is_empty() { "bin".to_owned() } else { ext };

    let path = temp_path("overlay", &ext);
    std::fs::write(&path, bytes)
        .with_context(|| format!("failed to stage overlay video '{}'", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "staged overlay video");

    Ok(StagedOverlay {
        temp: TempFileGuard::new(path.clone()),
        path,
    })
}

/// Unique path in the system temp directory; nothing is created.
pub(crate) fn temp_path(stem: &str, extension: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "repliq_{stem}_{}_{}_{}.{extension}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
        STAGE_COUNTER.fetch_add(1, Ordering::Relaxed),
    ))
}

/// Decode a base64 payload, optionally wrapped in a `data:` URI, into bytes and an extension hint.
pub(crate) fn decode_payload(payload: &str) -> ComposeResult<(Vec<u8>, &'static str)> {
    let payload = payload.trim();
    let (mime, data) = match payload.strip_prefix(DATA_URL_PREFIX) {
        Some(rest) => {
            let (meta, data) = rest
                .split_once(',')
                .ok_or_else(|| ComposeError::decode("data URI is missing ','"))?;
            let mut parts = meta.split(';');
            let mime = parts.next().unwrap_or("").trim().to_ascii_lowercase();
            if !parts.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
                return Err(ComposeError::decode("data URI is not base64 encoded"));
            }
            (Some(mime), data)
        }
        None => (None, payload),
    };

    let cleaned: Vec<u8> = data
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&cleaned)
        .map_err(|e| ComposeError::decode(format!("invalid base64 overlay payload: {e}")))?;

    let ext = match mime.as_deref() {
        Some("video/webm") => "webm",
        Some("video/mp4") => "mp4",
        Some("video/quicktime") => "mov",
        Some("video/x-matroska") => "mkv",
        _ => sniff_extension(&bytes),
    };
    Ok((bytes, ext))
}

fn sniff_extension(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x1a, 0x45, 0xdf, 0xa3]) {
        "webm"
    } else if bytes.get(4..8) == Some(b"ftyp") {
        "mp4"
    } else {
        "bin"
    }
}
