//! Data models for storage.

use chrono::{DateTime, Utc};
use modera_core::{MediaKind, SafetyStatus};
use serde::{Deserialize, Serialize};

/// An uploaded content item subject to moderation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    /// Unique identifier.
    pub id: i64,
    /// Opaque reference to the stored file.
    pub file_path: String,
    /// Image or video.
    pub media_kind: MediaKind,
    /// Current safety classification (AI- or moderator-assigned).
    pub safety_status: SafetyStatus,
    /// Upload timestamp (immutable).
    pub uploaded_at: DateTime<Utc>,
}

/// Parameters for creating a content item.
#[derive(Debug, Clone)]
pub struct NewContent {
    /// Opaque reference to the stored file.
    pub file_path: String,
    /// Image or video.
    pub media_kind: MediaKind,
}

/// A deduplicated label in the tag registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Unique identifier.
    pub id: i64,
    /// Unique, case-sensitive name.
    pub name: String,
}

/// The single moderation outcome (AI + moderator) for one content item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationRecord {
    /// Unique identifier.
    pub id: i64,
    /// Owning content item (1:1).
    pub content_id: i64,
    /// Classification timestamp (immutable).
    pub analyzed_at: DateTime<Utc>,
    /// Raw AI response text, or the gateway failure reason (immutable).
    pub ai_analysis_raw: String,
    /// Detected tag names resolved through the registry.
    pub detected_tags: Vec<String>,
    /// Whether a moderator has reviewed this record.
    pub moderator_reviewed: bool,
    /// Moderator free-text tags (comma-joined, separate from detected tags).
    pub moderator_tags: String,
    /// Moderator verdict comment.
    pub moderator_verdict: Option<String>,
}

/// Parameters for creating a moderation record.
#[derive(Debug, Clone)]
pub struct NewModerationRecord {
    /// Owning content item.
    pub content_id: i64,
    /// Raw AI response text (or failure reason).
    pub ai_analysis_raw: String,
}

/// Content counts per safety bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub safe: i64,
    pub potentially_unsafe: i64,
    #[serde(rename = "unsafe")]
    pub unsafe_count: i64,
}

impl StatusCounts {
    /// Total across all buckets.
    pub fn total(&self) -> i64 {
        self.safe + self.potentially_unsafe + self.unsafe_count
    }

    /// Count for a specific status.
    pub fn get(&self, status: SafetyStatus) -> i64 {
        match status {
            SafetyStatus::Safe => self.safe,
            SafetyStatus::PotentiallyUnsafe => self.potentially_unsafe,
            SafetyStatus::Unsafe => self.unsafe_count,
        }
    }

    pub(crate) fn set(&mut self, status: SafetyStatus, count: i64) {
        match status {
            SafetyStatus::Safe => self.safe = count,
            SafetyStatus::PotentiallyUnsafe => self.potentially_unsafe = count,
            SafetyStatus::Unsafe => self.unsafe_count = count,
        }
    }
}
