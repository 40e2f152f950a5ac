//! Naming and validation rules for uploaded and generated media files.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Accepted source face image extensions (lowercase, without dot).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Accepted target video extensions (lowercase, without dot).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "webm"];

/// Maximum length of a sanitized filename, in characters.
pub const MAX_FILENAME_LEN: usize = 255;

/// URL prefix under which finished artifacts are served.
pub const DOWNLOAD_ROUTE_PREFIX: &str = "/api/download/";

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_ .\-]").expect("valid filename regex"));

/// Kind of media an upload slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Source face image.
    Image,
    /// Target video.
    Video,
}

impl MediaKind {
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            Self::Image => IMAGE_EXTENSIONS,
            Self::Video => VIDEO_EXTENSIONS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// Strip directory components, drop characters outside
/// `[A-Za-z0-9_ .-]`, and cap the length.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(base, "");
    cleaned.chars().take(MAX_FILENAME_LEN).collect()
}

/// Lowercased extension of `filename`, if it has one.
pub fn extension_of(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Check `filename` against the allow-list for `kind`.
pub fn validate_extension(filename: &str, kind: MediaKind) -> Result<String, CoreError> {
    let allowed = kind.allowed_extensions();
    match extension_of(filename) {
        Some(ext) if allowed.contains(&ext.as_str()) => Ok(ext),
        _ => Err(CoreError::Validation(format!(
            "Invalid {} format. Allowed formats: {}",
            kind.label(),
            allowed
                .iter()
                .map(|e| format!(".{e}"))
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// Reject payloads larger than `max_bytes`.
pub fn validate_size(size: u64, max_bytes: u64) -> Result<(), CoreError> {
    if size > max_bytes {
        return Err(CoreError::Validation(format!(
            "File too large. Maximum size: {}MB",
            max_bytes / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Upload ids are service-generated UUIDs; anything else cannot match a
/// stored file.
pub fn is_valid_upload_id(upload_id: &str) -> bool {
    uuid::Uuid::parse_str(upload_id).is_ok()
}

/// On-disk name of an upload: `{upload_id}_{sanitized original name}`.
pub fn stored_upload_name(upload_id: &str, original: &str) -> String {
    format!("{upload_id}_{}", sanitize_filename(original))
}

/// On-disk name of a job's output artifact.
pub fn output_filename(job_id: &str) -> String {
    format!("{job_id}_output.mp4")
}

/// Download locator recorded in a completed job.
pub fn download_reference(filename: &str) -> String {
    format!("{DOWNLOAD_ROUTE_PREFIX}{filename}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
