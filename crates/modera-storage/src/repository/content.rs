//! Content item repository.

use chrono::Utc;
use modera_core::{MediaKind, SafetyStatus};
use rusqlite::{params, Connection, Row};

use super::parse_datetime;
use crate::error::Result;
use crate::models::{Content, NewContent, StatusCounts};

/// Repository for content item operations.
pub struct ContentRepo;

impl ContentRepo {
    /// Insert a new content item. The safety status starts at `safe`, the
    /// most permissive tier, until classification runs.
    pub fn insert(conn: &Connection, content: NewContent) -> Result<i64> {
        conn.execute(
            "INSERT INTO content (file_path, media_kind, safety_status, uploaded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                content.file_path,
                content.media_kind.as_str(),
                SafetyStatus::Safe.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a content item by ID.
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Content>> {
        let mut stmt = conn.prepare(
            "SELECT id, file_path, media_kind, safety_status, uploaded_at
             FROM content WHERE id = ?1",
        )?;

        let content = stmt.query_row([id], row_to_content).ok();
        Ok(content)
    }

    /// Update the safety status of a content item. Returns false when the
    /// item does not exist.
    pub fn set_safety_status(conn: &Connection, id: i64, status: SafetyStatus) -> Result<bool> {
        let updated = conn.execute(
            "UPDATE content SET safety_status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(updated > 0)
    }

    /// Get all content items with the given status, newest first.
    pub fn get_by_status(conn: &Connection, status: SafetyStatus) -> Result<Vec<Content>> {
        let mut stmt = conn.prepare(
            "SELECT id, file_path, media_kind, safety_status, uploaded_at
             FROM content WHERE safety_status = ?1
             ORDER BY uploaded_at DESC, id DESC",
        )?;

        let items = stmt
            .query_map([status.as_str()], row_to_content)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(items)
    }

    /// Get content items still needing review: either no moderation record
    /// exists yet, or the record has not been reviewed by a moderator.
    /// Optionally restricted to one safety bucket.
    pub fn get_needing_review(
        conn: &Connection,
        status: Option<SafetyStatus>,
    ) -> Result<Vec<Content>> {
        let mut sql = String::from(
            "SELECT c.id, c.file_path, c.media_kind, c.safety_status, c.uploaded_at
             FROM content c
             LEFT JOIN moderation_records r ON r.content_id = c.id
             WHERE (r.id IS NULL OR r.moderator_reviewed = 0)",
        );

        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = status {
            sql.push_str(" AND c.safety_status = ?");
            params_vec.push(Box::new(status.as_str().to_string()));
        }

        sql.push_str(" ORDER BY c.uploaded_at DESC, c.id DESC");

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let items = stmt
            .query_map(params_refs.as_slice(), row_to_content)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(items)
    }

    /// Aggregate content counts per safety bucket.
    pub fn count_by_status(conn: &Connection) -> Result<StatusCounts> {
        let mut stmt =
            conn.prepare("SELECT safety_status, COUNT(*) FROM content GROUP BY safety_status")?;

        let mut counts = StatusCounts::default();

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for (status, count) in rows.flatten() {
            if let Some(status) = SafetyStatus::parse(&status) {
                counts.set(status, count);
            }
        }

        Ok(counts)
    }

    /// Count all content items.
    pub fn count(conn: &Connection) -> Result<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM content", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete a content item (administrative use; cascades to its record).
    pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let deleted = conn.execute("DELETE FROM content WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }
}

fn row_to_content(row: &Row<'_>) -> rusqlite::Result<Content> {
    let media_kind: String = row.get(2)?;
    let safety_status: String = row.get(3)?;

    Ok(Content {
        id: row.get(0)?,
        file_path: row.get(1)?,
        media_kind: MediaKind::parse(&media_kind).unwrap_or(MediaKind::Image),
        safety_status: SafetyStatus::parse(&safety_status).unwrap_or(SafetyStatus::Safe),
        uploaded_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::run_migrations;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn insert_item(conn: &Connection, name: &str, kind: MediaKind) -> i64 {
        ContentRepo::insert(
            conn,
            NewContent {
                file_path: name.to_string(),
                media_kind: kind,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let conn = setup_db();
        let id = insert_item(&conn, "media/test.jpg", MediaKind::Image);

        let content = ContentRepo::get_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(content.file_path, "media/test.jpg");
        assert_eq!(content.media_kind, MediaKind::Image);
        assert_eq!(content.safety_status, SafetyStatus::Safe);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let conn = setup_db();
        assert!(ContentRepo::get_by_id(&conn, 42).unwrap().is_none());
    }

    #[test]
    fn test_set_safety_status() {
        let conn = setup_db();
        let id = insert_item(&conn, "a.mp4", MediaKind::Video);

        assert!(ContentRepo::set_safety_status(&conn, id, SafetyStatus::Unsafe).unwrap());
        let content = ContentRepo::get_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(content.safety_status, SafetyStatus::Unsafe);

        assert!(!ContentRepo::set_safety_status(&conn, 999, SafetyStatus::Safe).unwrap());
    }

    #[test]
    fn test_count_by_status_covers_all_items() {
        let conn = setup_db();
        for i in 0..4 {
            insert_item(&conn, &format!("{i}.jpg"), MediaKind::Image);
        }
        ContentRepo::set_safety_status(&conn, 1, SafetyStatus::Unsafe).unwrap();
        ContentRepo::set_safety_status(&conn, 2, SafetyStatus::PotentiallyUnsafe).unwrap();

        let counts = ContentRepo::count_by_status(&conn).unwrap();
        assert_eq!(counts.safe, 2);
        assert_eq!(counts.potentially_unsafe, 1);
        assert_eq!(counts.unsafe_count, 1);
        assert_eq!(counts.total(), ContentRepo::count(&conn).unwrap());
    }

    #[test]
    fn test_needing_review_includes_unclassified_items() {
        let conn = setup_db();
        let a = insert_item(&conn, "a.jpg", MediaKind::Image);
        let b = insert_item(&conn, "b.jpg", MediaKind::Image);

        // b gets a reviewed record; a has no record at all
        conn.execute(
            "INSERT INTO moderation_records (content_id, moderator_reviewed) VALUES (?1, 1)",
            [b],
        )
        .unwrap();

        let pending = ContentRepo::get_needing_review(&conn, None).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, a);
    }

    #[test]
    fn test_needing_review_with_status_filter() {
        let conn = setup_db();
        let a = insert_item(&conn, "a.jpg", MediaKind::Image);
        insert_item(&conn, "b.jpg", MediaKind::Image);
        ContentRepo::set_safety_status(&conn, a, SafetyStatus::Unsafe).unwrap();

        let pending =
            ContentRepo::get_needing_review(&conn, Some(SafetyStatus::Unsafe)).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, a);
    }
}
