//! The moderation workflow state machine.
//!
//! From the workflow's perspective a content item is in one of three
//! states:
//!
//! 1. **Unreviewed** — no moderation record exists yet.
//! 2. **AI-classified** — a record exists with `moderator_reviewed = false`
//!    and the content's safety status reflects the AI verdict (or the
//!    fail-open fallback).
//! 3. **Moderator-finalized** — the record has `moderator_reviewed = true`
//!    and the safety status reflects the moderator's explicit choice.
//!
//! [`ModerationWorkflow::classify`] is the only record-creating transition
//! and may run once per content item; every moderator operation requires
//! the record to exist.

use modera_core::{GatewayFailure, ParsedAnalysis, SafetyStatus, ValidationError};
use tracing::{info, warn};

use crate::error::StorageError;
use crate::models::{Content, ModerationRecord, NewModerationRecord, StatusCounts};
use crate::pool::ConnectionPool;
use crate::repository::{ContentRepo, RecordsRepo, TagsRepo};

/// Error type for workflow operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("moderation record already exists for content {0}")]
    RecordExists(i64),
}

// Raw rusqlite errors (transaction begin/commit) route through the
// storage taxonomy so `?` works at the workflow level.
impl From<rusqlite::Error> for WorkflowError {
    fn from(err: rusqlite::Error) -> Self {
        WorkflowError::Storage(StorageError::Database(err))
    }
}

/// Result type for workflow operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Outcome of the classify transition.
#[derive(Debug, Clone)]
pub struct ClassifyOutcome {
    /// The content item with its resolved safety status.
    pub content: Content,
    /// The newly created moderation record.
    pub record: ModerationRecord,
}

/// Current view of a content item and its record.
#[derive(Debug, Clone)]
pub struct ContentStatus {
    /// The content item.
    pub content: Content,
    /// Its moderation record, if classification has run.
    pub record: Option<ModerationRecord>,
    /// User-facing message for the current safety status.
    pub message: &'static str,
}

/// One safety bucket on the moderator dashboard.
#[derive(Debug, Clone)]
pub struct StatusBucket {
    /// The bucket's safety tier.
    pub status: SafetyStatus,
    /// Content items currently in this bucket, newest first.
    pub items: Vec<Content>,
    /// Item count for this bucket.
    pub count: i64,
}

/// Dashboard view: content grouped per safety bucket.
#[derive(Debug, Clone)]
pub struct Dashboard {
    /// One bucket per requested status (all three when unfiltered).
    pub buckets: Vec<StatusBucket>,
    /// Counts across all buckets regardless of filter.
    pub counts: StatusCounts,
    /// Total number of content items.
    pub total: i64,
}

/// The moderation workflow, backed by the database.
#[derive(Clone)]
pub struct ModerationWorkflow {
    pool: ConnectionPool,
}

impl ModerationWorkflow {
    /// Creates a workflow over the given connection pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    // ==================== Transitions ====================

    /// Unreviewed → AI-classified.
    ///
    /// Consumes the gateway outcome for a content item: parses the raw
    /// verdict (fail-open on failure or malformed output), resolves
    /// detected tags through the registry, creates the moderation record,
    /// and sets the content's safety status — atomically.
    ///
    /// Fails with [`WorkflowError::RecordExists`] when a record already
    /// exists; the first classification is never overwritten.
    pub fn classify(
        &self,
        content_id: i64,
        gateway_result: std::result::Result<String, GatewayFailure>,
    ) -> Result<ClassifyOutcome> {
        let conn = self.pool.get()?;

        if ContentRepo::get_by_id(&conn, content_id)?.is_none() {
            return Err(WorkflowError::NotFound(format!("content {content_id}")));
        }

        // Fail-open policy: a gateway failure still produces a record, with
        // the failure reason as the raw analysis text.
        let analysis = match gateway_result {
            Ok(raw) => modera_core::parse_analysis(&raw),
            Err(failure) => {
                warn!(content_id, reason = %failure, "gateway failure, falling back to safe");
                let reason = failure.reason();
                ParsedAnalysis {
                    status: SafetyStatus::Safe,
                    tags: Vec::new(),
                    explanation: reason.clone(),
                    raw: reason,
                }
            }
        };

        let tx = conn.unchecked_transaction()?;

        let record_id = match RecordsRepo::insert(
            &tx,
            NewModerationRecord {
                content_id,
                ai_analysis_raw: analysis.raw.clone(),
            },
        ) {
            Ok(id) => id,
            Err(StorageError::AlreadyExists(_)) => {
                return Err(WorkflowError::RecordExists(content_id));
            }
            Err(err) => return Err(err.into()),
        };

        let tags = TagsRepo::bulk_get_or_create(&tx, &analysis.tags)?;
        let tag_ids: Vec<i64> = tags.iter().map(|t| t.id).collect();
        RecordsRepo::attach_tags(&tx, record_id, &tag_ids)?;

        ContentRepo::set_safety_status(&tx, content_id, analysis.status)?;

        tx.commit()?;

        info!(
            content_id,
            record_id,
            status = %analysis.status,
            tags = tags.len(),
            "content classified"
        );

        let content = ContentRepo::get_by_id(&conn, content_id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("content {content_id}")))?;
        let record = RecordsRepo::get_by_id(&conn, record_id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("record {record_id}")))?;

        Ok(ClassifyOutcome { content, record })
    }

    /// Mark a record as reviewed without requiring tag or verdict input.
    /// The safety status and tags are left untouched.
    pub fn mark_verified(&self, record_id: i64) -> Result<ModerationRecord> {
        let conn = self.pool.get()?;

        if !RecordsRepo::set_reviewed(&conn, record_id)? {
            return Err(WorkflowError::NotFound(format!("record {record_id}")));
        }

        info!(record_id, "record marked as verified");

        RecordsRepo::get_by_id(&conn, record_id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("record {record_id}")))
    }

    /// Update the moderator-authored annotation fields (free-text tags and
    /// verdict comment) for a content item's record. Legal in both the
    /// AI-classified and finalized states; does not change the review flag
    /// or the safety status.
    pub fn update_annotation(
        &self,
        content_id: i64,
        moderator_tags: &str,
        moderator_verdict: Option<&str>,
    ) -> Result<ModerationRecord> {
        let tags = modera_core::normalize_moderator_tags(moderator_tags)?;

        let conn = self.pool.get()?;

        let record = RecordsRepo::get_by_content_id(&conn, content_id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("record for content {content_id}")))?;

        RecordsRepo::update_annotation(&conn, record.id, &tags, moderator_verdict)?;

        info!(content_id, record_id = record.id, "moderator annotation updated");

        RecordsRepo::get_by_id(&conn, record.id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("record {}", record.id)))
    }

    /// AI-classified → Moderator-finalized (re-entrant once finalized).
    ///
    /// The authoritative human override: validates the chosen status,
    /// then atomically updates the content's safety status, the record's
    /// moderator fields, and the review flag. Validation failures leave
    /// all prior state untouched.
    pub fn finalize(
        &self,
        content_id: i64,
        chosen_status: &str,
        moderator_tags: &str,
        moderator_verdict: Option<&str>,
    ) -> Result<ContentStatus> {
        let status = SafetyStatus::parse(chosen_status)
            .ok_or_else(|| ValidationError::InvalidStatus(chosen_status.to_string()))?;
        let tags = modera_core::normalize_moderator_tags(moderator_tags)?;

        let conn = self.pool.get()?;

        let record = RecordsRepo::get_by_content_id(&conn, content_id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("record for content {content_id}")))?;

        let tx = conn.unchecked_transaction()?;
        ContentRepo::set_safety_status(&tx, content_id, status)?;
        RecordsRepo::update_annotation(&tx, record.id, &tags, moderator_verdict)?;
        RecordsRepo::set_reviewed(&tx, record.id)?;
        tx.commit()?;

        info!(content_id, status = %status, "review finalized");

        // The pool's mutex is not reentrant; release the connection before
        // content_status acquires its own.
        drop(conn);
        self.content_status(content_id)
    }

    /// Administrative shortcut: change only the safety status.
    ///
    /// Deliberately does NOT set the review flag or touch moderator
    /// fields — callers wanting the full override use [`Self::finalize`].
    pub fn update_status_directly(
        &self,
        content_id: i64,
        new_status: &str,
    ) -> Result<Content> {
        let status = SafetyStatus::parse(new_status)
            .ok_or_else(|| ValidationError::InvalidStatus(new_status.to_string()))?;

        let conn = self.pool.get()?;

        if !ContentRepo::set_safety_status(&conn, content_id, status)? {
            return Err(WorkflowError::NotFound(format!("content {content_id}")));
        }

        info!(content_id, status = %status, "safety status updated directly");

        ContentRepo::get_by_id(&conn, content_id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("content {content_id}")))
    }

    // ==================== Queries ====================

    /// Current classification, record, and display message for an item.
    pub fn content_status(&self, content_id: i64) -> Result<ContentStatus> {
        let conn = self.pool.get()?;

        let content = ContentRepo::get_by_id(&conn, content_id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("content {content_id}")))?;
        let record = RecordsRepo::get_by_content_id(&conn, content_id)?;
        let message = content.safety_status.display_message();

        Ok(ContentStatus {
            content,
            record,
            message,
        })
    }

    /// Content grouped per safety bucket, optionally restricted to one
    /// status. Counts always cover all buckets.
    pub fn dashboard(&self, filter: Option<SafetyStatus>) -> Result<Dashboard> {
        let conn = self.pool.get()?;

        let statuses: Vec<SafetyStatus> = match filter {
            Some(status) => vec![status],
            None => SafetyStatus::all().to_vec(),
        };

        let mut buckets = Vec::with_capacity(statuses.len());
        for status in statuses {
            let items = ContentRepo::get_by_status(&conn, status)?;
            buckets.push(StatusBucket {
                status,
                count: items.len() as i64,
                items,
            });
        }

        let counts = ContentRepo::count_by_status(&conn)?;
        let total = ContentRepo::count(&conn)?;

        Ok(Dashboard {
            buckets,
            counts,
            total,
        })
    }

    /// Content items needing review: no record yet, or not yet reviewed.
    pub fn needing_review(&self, filter: Option<SafetyStatus>) -> Result<Vec<Content>> {
        let conn = self.pool.get()?;
        Ok(ContentRepo::get_needing_review(&conn, filter)?)
    }

    /// Records awaiting moderator review.
    pub fn unverified_records(&self) -> Result<Vec<ModerationRecord>> {
        let conn = self.pool.get()?;
        Ok(RecordsRepo::get_unreviewed(&conn)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewContent;
    use modera_core::MediaKind;

    fn setup() -> ModerationWorkflow {
        ModerationWorkflow::new(ConnectionPool::in_memory().unwrap())
    }

    fn upload(workflow: &ModerationWorkflow, name: &str) -> i64 {
        let conn = workflow.pool.get().unwrap();
        ContentRepo::insert(
            &conn,
            NewContent {
                file_path: name.to_string(),
                media_kind: MediaKind::Image,
            },
        )
        .unwrap()
    }

    const UNSAFE_VERDICT: &str = r#"{"detected_tags": ["violence", "blood"], "safety_level": "unsafe", "explanation": "graphic imagery"}"#;

    #[test]
    fn classify_success_sets_status_and_tags() {
        let workflow = setup();
        let content_id = upload(&workflow, "a.jpg");

        let outcome = workflow
            .classify(content_id, Ok(UNSAFE_VERDICT.to_string()))
            .unwrap();

        assert_eq!(outcome.content.safety_status, SafetyStatus::Unsafe);
        assert_eq!(outcome.record.detected_tags, vec!["blood", "violence"]);
        assert!(!outcome.record.moderator_reviewed);
        assert_eq!(outcome.record.ai_analysis_raw, UNSAFE_VERDICT);
    }

    #[test]
    fn classify_twice_fails_without_overwriting() {
        let workflow = setup();
        let content_id = upload(&workflow, "a.jpg");

        workflow
            .classify(content_id, Ok(UNSAFE_VERDICT.to_string()))
            .unwrap();

        let second = workflow.classify(
            content_id,
            Ok(r#"{"safety_level": "safe"}"#.to_string()),
        );
        assert!(matches!(second, Err(WorkflowError::RecordExists(id)) if id == content_id));

        // First verdict untouched
        let status = workflow.content_status(content_id).unwrap();
        assert_eq!(status.content.safety_status, SafetyStatus::Unsafe);
    }

    #[test]
    fn classify_gateway_failure_fails_open() {
        let workflow = setup();
        let content_id = upload(&workflow, "a.jpg");

        let outcome = workflow
            .classify(
                content_id,
                Err(GatewayFailure::Network("connection refused".to_string())),
            )
            .unwrap();

        assert_eq!(outcome.content.safety_status, SafetyStatus::Safe);
        assert!(outcome.record.detected_tags.is_empty());
        // The raw text reflects the failure reason, never left blank
        assert!(outcome.record.ai_analysis_raw.contains("connection refused"));
    }

    #[test]
    fn classify_malformed_response_fails_open() {
        let workflow = setup();
        let content_id = upload(&workflow, "a.jpg");

        let outcome = workflow
            .classify(content_id, Ok("I cannot analyze this image.".to_string()))
            .unwrap();

        assert_eq!(outcome.content.safety_status, SafetyStatus::Safe);
        assert!(outcome.record.detected_tags.is_empty());
        assert_eq!(outcome.record.ai_analysis_raw, "I cannot analyze this image.");
    }

    #[test]
    fn classify_fenced_response_is_stripped() {
        let workflow = setup();
        let content_id = upload(&workflow, "a.jpg");

        let fenced = format!("```json\n{UNSAFE_VERDICT}\n```");
        let outcome = workflow.classify(content_id, Ok(fenced)).unwrap();

        assert_eq!(outcome.content.safety_status, SafetyStatus::Unsafe);
        assert!(!outcome.record.ai_analysis_raw.contains("```"));
    }

    #[test]
    fn classify_unknown_content_is_not_found() {
        let workflow = setup();
        let result = workflow.classify(404, Ok("{}".to_string()));
        assert!(matches!(result, Err(WorkflowError::NotFound(_))));
    }

    #[test]
    fn shared_tags_resolve_to_same_identity() {
        let workflow = setup();
        let a = upload(&workflow, "a.jpg");
        let b = upload(&workflow, "b.jpg");

        workflow.classify(a, Ok(UNSAFE_VERDICT.to_string())).unwrap();
        workflow.classify(b, Ok(UNSAFE_VERDICT.to_string())).unwrap();

        let conn = workflow.pool.get().unwrap();
        assert_eq!(TagsRepo::count(&conn).unwrap(), 2);
    }

    #[test]
    fn mark_verified_flips_only_the_flag() {
        let workflow = setup();
        let content_id = upload(&workflow, "a.jpg");
        let outcome = workflow
            .classify(content_id, Ok(UNSAFE_VERDICT.to_string()))
            .unwrap();

        let record = workflow.mark_verified(outcome.record.id).unwrap();
        assert!(record.moderator_reviewed);
        assert_eq!(record.detected_tags, vec!["blood", "violence"]);

        let status = workflow.content_status(content_id).unwrap();
        assert_eq!(status.content.safety_status, SafetyStatus::Unsafe);
    }

    #[test]
    fn mark_verified_missing_record_is_not_found() {
        let workflow = setup();
        assert!(matches!(
            workflow.mark_verified(7),
            Err(WorkflowError::NotFound(_))
        ));
    }

    #[test]
    fn update_annotation_touches_only_moderator_fields() {
        let workflow = setup();
        let content_id = upload(&workflow, "a.jpg");
        workflow
            .classify(content_id, Ok(UNSAFE_VERDICT.to_string()))
            .unwrap();

        let record = workflow
            .update_annotation(content_id, "tag1, tag2", Some("borderline"))
            .unwrap();

        assert_eq!(record.moderator_tags, "tag1, tag2");
        assert_eq!(record.moderator_verdict.as_deref(), Some("borderline"));
        assert!(!record.moderator_reviewed);

        let status = workflow.content_status(content_id).unwrap();
        assert_eq!(status.content.safety_status, SafetyStatus::Unsafe);
    }

    #[test]
    fn update_annotation_requires_record() {
        let workflow = setup();
        let content_id = upload(&workflow, "a.jpg");

        // No classify yet: record is missing
        let result = workflow.update_annotation(content_id, "t", None);
        assert!(matches!(result, Err(WorkflowError::NotFound(_))));
    }

    #[test]
    fn finalize_overrides_ai_verdict() {
        let workflow = setup();
        let content_id = upload(&workflow, "a.jpg");
        workflow
            .classify(content_id, Ok(UNSAFE_VERDICT.to_string()))
            .unwrap();

        let status = workflow
            .finalize(
                content_id,
                "potentially_unsafe",
                "tag1, tag2",
                Some("looks borderline"),
            )
            .unwrap();

        assert_eq!(
            status.content.safety_status,
            SafetyStatus::PotentiallyUnsafe
        );
        let record = status.record.unwrap();
        assert!(record.moderator_reviewed);
        assert_eq!(record.moderator_tags, "tag1, tag2");
        assert_eq!(record.moderator_verdict.as_deref(), Some("looks borderline"));
    }

    #[test]
    fn finalize_invalid_status_leaves_state_untouched() {
        let workflow = setup();
        let content_id = upload(&workflow, "a.jpg");
        workflow
            .classify(content_id, Ok(UNSAFE_VERDICT.to_string()))
            .unwrap();

        let result = workflow.finalize(content_id, "catastrophic", "t", None);
        assert!(matches!(result, Err(WorkflowError::Validation(_))));

        let status = workflow.content_status(content_id).unwrap();
        assert_eq!(status.content.safety_status, SafetyStatus::Unsafe);
        let record = status.record.unwrap();
        assert!(!record.moderator_reviewed);
        assert_eq!(record.moderator_tags, "");
    }

    #[test]
    fn finalize_does_not_hold_the_pool_lock_across_its_result_query() {
        let workflow = setup();
        let content_id = upload(&workflow, "a.jpg");
        workflow
            .classify(content_id, Ok(UNSAFE_VERDICT.to_string()))
            .unwrap();

        // finalize re-reads through the pool after committing; if it still
        // held its original connection it would block on the mutex forever.
        let (tx, rx) = std::sync::mpsc::channel();
        let worker = workflow.clone();
        std::thread::spawn(move || {
            let result = worker.finalize(content_id, "safe", "", None);
            let _ = tx.send(result);
        });

        let status = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("finalize must complete without blocking on the pool")
            .unwrap();
        assert_eq!(status.content.safety_status, SafetyStatus::Safe);
        assert!(status.record.unwrap().moderator_reviewed);
    }

    #[test]
    fn finalize_is_reentrant() {
        let workflow = setup();
        let content_id = upload(&workflow, "a.jpg");
        workflow
            .classify(content_id, Ok(UNSAFE_VERDICT.to_string()))
            .unwrap();

        workflow
            .finalize(content_id, "unsafe", "first", None)
            .unwrap();
        let status = workflow
            .finalize(content_id, "safe", "second", Some("on reflection"))
            .unwrap();

        assert_eq!(status.content.safety_status, SafetyStatus::Safe);
        assert_eq!(status.record.unwrap().moderator_tags, "second");
    }

    #[test]
    fn update_status_directly_skips_review_flag() {
        let workflow = setup();
        let content_id = upload(&workflow, "a.jpg");
        workflow
            .classify(content_id, Ok(UNSAFE_VERDICT.to_string()))
            .unwrap();

        let content = workflow
            .update_status_directly(content_id, "potentially_unsafe")
            .unwrap();
        assert_eq!(content.safety_status, SafetyStatus::PotentiallyUnsafe);

        // Intentional asymmetry with finalize: the record stays unreviewed
        let status = workflow.content_status(content_id).unwrap();
        assert!(!status.record.unwrap().moderator_reviewed);
    }

    #[test]
    fn update_status_directly_validates_input() {
        let workflow = setup();
        let content_id = upload(&workflow, "a.jpg");

        assert!(matches!(
            workflow.update_status_directly(content_id, "extreme"),
            Err(WorkflowError::Validation(_))
        ));
        assert!(matches!(
            workflow.update_status_directly(999, "safe"),
            Err(WorkflowError::NotFound(_))
        ));
    }

    #[test]
    fn content_status_carries_display_message() {
        let workflow = setup();
        let content_id = upload(&workflow, "a.jpg");
        workflow
            .classify(content_id, Ok(UNSAFE_VERDICT.to_string()))
            .unwrap();

        let status = workflow.content_status(content_id).unwrap();
        assert_eq!(status.message, SafetyStatus::Unsafe.display_message());
    }

    #[test]
    fn dashboard_buckets_cover_all_items() {
        let workflow = setup();
        for (name, verdict) in [
            ("a.jpg", r#"{"safety_level": "safe"}"#),
            ("b.jpg", r#"{"safety_level": "unsafe"}"#),
            ("c.jpg", r#"{"safety_level": "potentially_unsafe"}"#),
            ("d.jpg", r#"{"safety_level": "safe"}"#),
        ] {
            let id = upload(&workflow, name);
            workflow.classify(id, Ok(verdict.to_string())).unwrap();
        }

        let dashboard = workflow.dashboard(None).unwrap();
        assert_eq!(dashboard.buckets.len(), 3);
        let combined: i64 = dashboard.buckets.iter().map(|b| b.count).sum();
        assert_eq!(combined, dashboard.total);
        assert_eq!(dashboard.counts.total(), dashboard.total);
    }

    #[test]
    fn dashboard_with_filter_returns_single_bucket() {
        let workflow = setup();
        let id = upload(&workflow, "a.jpg");
        workflow
            .classify(id, Ok(r#"{"safety_level": "unsafe"}"#.to_string()))
            .unwrap();

        let dashboard = workflow.dashboard(Some(SafetyStatus::Unsafe)).unwrap();
        assert_eq!(dashboard.buckets.len(), 1);
        assert_eq!(dashboard.buckets[0].count, 1);
        // Counts still span every bucket
        assert_eq!(dashboard.counts.total(), 1);
    }

    #[test]
    fn unverified_records_shrink_as_reviews_complete() {
        let workflow = setup();
        let mut record_ids = Vec::new();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            let id = upload(&workflow, name);
            let outcome = workflow
                .classify(id, Ok(r#"{"safety_level": "safe"}"#.to_string()))
                .unwrap();
            record_ids.push(outcome.record.id);
        }

        assert_eq!(workflow.unverified_records().unwrap().len(), 3);

        workflow.mark_verified(record_ids[0]).unwrap();
        assert_eq!(workflow.unverified_records().unwrap().len(), 2);
    }
}
