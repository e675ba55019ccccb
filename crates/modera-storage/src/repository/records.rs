//! Moderation record repository.

use chrono::Utc;
use rusqlite::{params, Connection, Row};

use super::parse_datetime;
use crate::error::{Result, StorageError};
use crate::models::{ModerationRecord, NewModerationRecord};

/// Repository for moderation record operations.
pub struct RecordsRepo;

impl RecordsRepo {
    /// Insert a new moderation record.
    ///
    /// The UNIQUE constraint on `content_id` enforces the one-record-per-
    /// content invariant; a duplicate insert surfaces as `AlreadyExists`.
    pub fn insert(conn: &Connection, record: NewModerationRecord) -> Result<i64> {
        let result = conn.execute(
            "INSERT INTO moderation_records (content_id, analyzed_at, ai_analysis_raw)
             VALUES (?1, ?2, ?3)",
            params![
                record.content_id,
                Utc::now().to_rfc3339(),
                record.ai_analysis_raw,
            ],
        );

        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(err) if StorageError::is_unique_violation(&err) => {
                Err(StorageError::AlreadyExists(format!(
                    "moderation record for content {}",
                    record.content_id
                )))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Get a record by ID, with its detected tags resolved.
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<ModerationRecord>> {
        Self::get_where(conn, "r.id = ?1", id)
    }

    /// Get the record owned by a content item.
    pub fn get_by_content_id(conn: &Connection, content_id: i64) -> Result<Option<ModerationRecord>> {
        Self::get_where(conn, "r.content_id = ?1", content_id)
    }

    fn get_where(conn: &Connection, clause: &str, param: i64) -> Result<Option<ModerationRecord>> {
        let sql = format!(
            "SELECT r.id, r.content_id, r.analyzed_at, r.ai_analysis_raw,
                    r.moderator_reviewed, r.moderator_tags, r.moderator_verdict
             FROM moderation_records r WHERE {clause}"
        );

        let mut stmt = conn.prepare(&sql)?;
        let record = stmt.query_row([param], row_to_record).ok();

        match record {
            Some(mut record) => {
                record.detected_tags = Self::tags_for(conn, record.id)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Associate detected tags with a record (set semantics).
    pub fn attach_tags(conn: &Connection, record_id: i64, tag_ids: &[i64]) -> Result<()> {
        let mut stmt = conn.prepare(
            "INSERT OR IGNORE INTO record_tags (record_id, tag_id) VALUES (?1, ?2)",
        )?;

        for tag_id in tag_ids {
            stmt.execute(params![record_id, tag_id])?;
        }

        Ok(())
    }

    /// Names of the detected tags for a record, ordered by name.
    pub fn tags_for(conn: &Connection, record_id: i64) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT t.name FROM tags t
             JOIN record_tags rt ON rt.tag_id = t.id
             WHERE rt.record_id = ?1
             ORDER BY t.name",
        )?;

        let names = stmt
            .query_map([record_id], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(names)
    }

    /// Mark a record as reviewed by a moderator. Returns false when the
    /// record does not exist.
    pub fn set_reviewed(conn: &Connection, id: i64) -> Result<bool> {
        let updated = conn.execute(
            "UPDATE moderation_records SET moderator_reviewed = 1 WHERE id = ?1",
            [id],
        )?;
        Ok(updated > 0)
    }

    /// Update the moderator-authored annotation fields only.
    pub fn update_annotation(
        conn: &Connection,
        id: i64,
        moderator_tags: &str,
        moderator_verdict: Option<&str>,
    ) -> Result<bool> {
        let updated = conn.execute(
            "UPDATE moderation_records SET moderator_tags = ?1, moderator_verdict = ?2
             WHERE id = ?3",
            params![moderator_tags, moderator_verdict, id],
        )?;
        Ok(updated > 0)
    }

    /// Get all records not yet reviewed by a moderator, newest first.
    pub fn get_unreviewed(conn: &Connection) -> Result<Vec<ModerationRecord>> {
        let mut stmt = conn.prepare(
            "SELECT r.id, r.content_id, r.analyzed_at, r.ai_analysis_raw,
                    r.moderator_reviewed, r.moderator_tags, r.moderator_verdict
             FROM moderation_records r
             WHERE r.moderator_reviewed = 0
             ORDER BY r.analyzed_at DESC, r.id DESC",
        )?;

        let mut records: Vec<ModerationRecord> = stmt
            .query_map([], row_to_record)?
            .filter_map(|r| r.ok())
            .collect();

        for record in &mut records {
            record.detected_tags = Self::tags_for(conn, record.id)?;
        }

        Ok(records)
    }

    /// Count all records.
    pub fn count(conn: &Connection) -> Result<i64> {
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM moderation_records", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ModerationRecord> {
    Ok(ModerationRecord {
        id: row.get(0)?,
        content_id: row.get(1)?,
        analyzed_at: parse_datetime(&row.get::<_, String>(2)?),
        ai_analysis_raw: row.get(3)?,
        detected_tags: Vec::new(),
        moderator_reviewed: row.get::<_, i64>(4)? != 0,
        moderator_tags: row.get(5)?,
        moderator_verdict: row.get(6)?,
    })
}
