//! API request and response models.

use chrono::{DateTime, Utc};
use modera_core::{MediaKind, SafetyStatus};
use modera_storage::{Content, ModerationRecord, StatusCounts};
use serde::{Deserialize, Serialize};

/// Content entry in responses.
#[derive(Debug, Serialize)]
pub struct ContentEntry {
    pub id: i64,
    pub file_path: String,
    pub media_kind: MediaKind,
    pub safety_status: SafetyStatus,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Content> for ContentEntry {
    fn from(c: Content) -> Self {
        Self {
            id: c.id,
            file_path: c.file_path,
            media_kind: c.media_kind,
            safety_status: c.safety_status,
            uploaded_at: c.uploaded_at,
        }
    }
}

/// Moderation record entry in responses.
#[derive(Debug, Serialize)]
pub struct RecordEntry {
    pub id: i64,
    pub content_id: i64,
    pub analyzed_at: DateTime<Utc>,
    pub ai_analysis: String,
    pub detected_tags: Vec<String>,
    pub moderator_reviewed: bool,
    pub moderator_tags: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderator_verdict: Option<String>,
}

impl From<ModerationRecord> for RecordEntry {
    fn from(r: ModerationRecord) -> Self {
        Self {
            id: r.id,
            content_id: r.content_id,
            analyzed_at: r.analyzed_at,
            ai_analysis: r.ai_analysis_raw,
            detected_tags: r.detected_tags,
            moderator_reviewed: r.moderator_reviewed,
            moderator_tags: r.moderator_tags,
            moderator_verdict: r.moderator_verdict,
        }
    }
}

/// Response body for POST /api/upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub content_id: i64,
    pub record_id: i64,
    pub safety_status: SafetyStatus,
    /// User-facing message for the assigned tier.
    pub message: &'static str,
    pub detected_tags: Vec<String>,
}

/// Response body for GET /api/content/{id}/status.
#[derive(Debug, Serialize)]
pub struct ContentStatusResponse {
    pub content: ContentEntry,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<RecordEntry>,
}

/// Query parameters for GET /api/moderator/dashboard.
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// Restrict to one safety bucket (optional).
    pub status: Option<String>,
}

/// One safety bucket on the dashboard.
#[derive(Debug, Serialize)]
pub struct BucketEntry {
    pub status: SafetyStatus,
    pub count: i64,
    pub items: Vec<ContentEntry>,
}

/// Response body for GET /api/moderator/dashboard.
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub buckets: Vec<BucketEntry>,
    /// Counts across all buckets regardless of filter.
    pub counts: StatusCounts,
    pub total: i64,
}

/// Request body for POST /api/content/{id}/update-status.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// New safety status (wire string).
    pub status: String,
}

/// Response body for POST /api/content/{id}/update-status.
#[derive(Debug, Serialize)]
pub struct UpdateStatusResponse {
    pub success: bool,
    pub content: ContentEntry,
}

/// Query parameters for GET /api/moderator/review-queue.
#[derive(Debug, Deserialize)]
pub struct ReviewQueueQuery {
    /// Restrict to one safety bucket (optional).
    pub status: Option<String>,
}

/// Response body for GET /api/moderator/review-queue.
#[derive(Debug, Serialize)]
pub struct ReviewQueueResponse {
    pub items: Vec<ContentEntry>,
    pub total: usize,
}

/// Response body for GET /api/moderator/unverified.
#[derive(Debug, Serialize)]
pub struct UnverifiedResponse {
    pub records: Vec<RecordEntry>,
    pub total: usize,
}

/// Response body for POST /api/moderation/{id}/verify.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub record: RecordEntry,
}

/// Request body for POST /api/content/{id}/tags.
#[derive(Debug, Deserialize)]
pub struct AnnotateRequest {
    /// Comma-separated moderator tags.
    #[serde(default)]
    pub tags: String,
    /// Optional verdict comment.
    pub verdict: Option<String>,
}

/// Request body for POST /api/content/{id}/finalize.
#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    /// Final safety status chosen by the moderator (wire string).
    pub status: String,
    /// Comma-separated moderator tags.
    #[serde(default)]
    pub tags: String,
    /// Optional verdict comment.
    pub verdict: Option<String>,
}

/// Request body for POST /api/ask.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    /// The text to analyze.
    pub text: String,
    /// The question about the text.
    pub question: String,
}

/// Response body for POST /api/ask.
#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
}

/// Response body for GET /api/health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub content_count: i64,
}
