//! Media kinds and upload validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum accepted upload size in bytes (10 MB).
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Accepted image file extensions (lowercase).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Accepted video file extensions (lowercase).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "wmv", "flv", "webm"];

/// Validation failures for uploaded files and moderator input.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// File extension is not in either allow-list.
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Filename carries no extension at all.
    #[error("file name has no extension: {0}")]
    MissingExtension(String),

    /// Upload exceeds [`MAX_UPLOAD_SIZE`].
    #[error("file size {0} bytes exceeds the 10MB limit")]
    FileTooLarge(usize),

    /// Upload is empty.
    #[error("uploaded file is empty")]
    EmptyFile,

    /// Tag name failed normalization rules.
    #[error("invalid tag: {0}")]
    InvalidTag(String),

    /// Safety status string outside the valid enumeration.
    #[error("invalid safety status: {0}")]
    InvalidStatus(String),
}

/// Kind of uploaded media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Database/wire string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// Parse from the wire string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    /// Determine the media kind from a file name's extension.
    pub fn from_file_name(name: &str) -> Result<Self, ValidationError> {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .ok_or_else(|| ValidationError::MissingExtension(name.to_string()))?;

        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Ok(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Ok(MediaKind::Video)
        } else {
            Err(ValidationError::UnsupportedFileType(ext))
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate an upload before any classification attempt.
///
/// Checks the extension against the allow-lists and the payload size
/// against [`MAX_UPLOAD_SIZE`]. Returns the detected media kind.
pub fn validate_upload(file_name: &str, size: usize) -> Result<MediaKind, ValidationError> {
    if size == 0 {
        return Err(ValidationError::EmptyFile);
    }
    if size > MAX_UPLOAD_SIZE {
        return Err(ValidationError::FileTooLarge(size));
    }
    MediaKind::from_file_name(file_name)
}
