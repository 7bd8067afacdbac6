// Uploaded video handling: safe file names, request-scoped temp files and
// base64 payload decoding for the job endpoint.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions accepted from the `files` entries of a job payload
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".avi"];

/// Name used when sanitizing leaves nothing
const FALLBACK_NAME: &str = "video";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No video data found in request")]
    NoVideoData,

    #[error("Invalid base64 video data: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type UploadResult<T> = Result<T, UploadError>;

/// Reduce a client-supplied file name to a safe single path component.
///
/// Directory parts are dropped, whitespace becomes `_`, and anything outside
/// ASCII alphanumerics, `.`, `-` and `_` is removed. Leading dots are trimmed.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// Uploaded video stored on disk for the duration of one request.
/// The file is removed when the value is dropped.
#[derive(Debug)]
pub struct TempVideo {
    path: PathBuf,
}

impl TempVideo {
    /// Write `bytes` to `<upload_dir>/<uuid>_<secure name>`
    pub fn write(upload_dir: &Path, original_name: &str, bytes: &[u8]) -> UploadResult<Self> {
        std::fs::create_dir_all(upload_dir)?;

        let mut name = secure_filename(original_name);
        if name.is_empty() {
            name = FALLBACK_NAME.to_string();
        }

        let path = upload_dir.join(format!("{}_{}", uuid::Uuid::new_v4(), name));
        std::fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Stored uploaded video");

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempVideo {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove uploaded video");
            }
        }
    }
}

/// Decoded video from a job payload
#[derive(Debug, Clone, PartialEq)]
pub struct VideoPayload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

fn is_video_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Extract the video from a job's `input` object.
///
/// `input.video` (base64) wins; otherwise the first `input.files` entry
/// whose name has a video extension is used. Map entries are visited in
/// the order they appear in the request document.
pub fn decode_video_payload(input: &Value) -> UploadResult<VideoPayload> {
    if let Some(encoded) = input.get("video").and_then(Value::as_str) {
        return Ok(VideoPayload {
            file_name: "input_video.mp4".to_string(),
            bytes: STANDARD.decode(encoded.trim())?,
        });
    }

    // `files` arrives either as a name -> content map or a list of {name, content}
    let entries: Vec<(&str, &Value)> = match input.get("files") {
        Some(Value::Object(map)) => map.iter().map(|(name, content)| (name.as_str(), content)).collect(),
        Some(Value::Array(list)) => list
            .iter()
            .filter_map(|file| {
                let name = file.get("name")?.as_str()?;
                Some((name, file.get("content")?))
            })
            .collect(),
        _ => Vec::new(),
    };

    for (name, content) in entries {
        if !is_video_name(name) {
            continue;
        }
        if let Some(content) = content.as_str() {
            return Ok(VideoPayload {
                file_name: name.to_string(),
                bytes: STANDARD.decode(content.trim())?,
            });
        }
    }

    Err(UploadError::NoVideoData)
}
