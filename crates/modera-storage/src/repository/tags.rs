//! Tag registry repository.
//!
//! Tags are deduplicated labels shared across all moderation records.
//! Creation is lazy get-or-create; the UNIQUE constraint on `name` plus
//! upsert-then-read keeps concurrent creation from producing duplicates.

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::Tag;

/// Baseline dangerous-tag vocabulary seeded on request.
pub const BASELINE_TAGS: &[&str] = &[
    "pornography",
    "violence",
    "profanity",
    "dangerous_symbols",
    "hate_speech",
    "weapons",
    "drugs",
    "self_harm",
    "extremism",
    "nudity",
    "blood",
    "gore",
    "terrorism",
    "nazi_symbols",
    "racist_content",
    "sexual_content",
    "disturbing_content",
    "graphic_violence",
    "suicide",
    "abuse",
];

/// Repository for tag registry operations.
pub struct TagsRepo;

impl TagsRepo {
    /// Get an existing tag by exact name or create it.
    ///
    /// The name is trimmed and validated (non-empty, at most 50 chars).
    /// Race-safe: `INSERT ... ON CONFLICT DO NOTHING` followed by a
    /// re-read, so two concurrent callers converge on the same row.
    pub fn get_or_create(conn: &Connection, name: &str) -> Result<Tag> {
        let name = modera_core::normalize_tag_name(name)?;

        conn.execute(
            "INSERT INTO tags (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
            [&name],
        )?;

        let tag = conn.query_row("SELECT id, name FROM tags WHERE name = ?1", [&name], |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        Ok(tag)
    }

    /// Resolve a batch of raw tag names into registry tags.
    ///
    /// Entries that are empty after trimming or otherwise invalid are
    /// skipped silently — they are AI output noise, not errors. The result
    /// is deduplicated by name.
    pub fn bulk_get_or_create(conn: &Connection, names: &[String]) -> Result<Vec<Tag>> {
        let mut tags: Vec<Tag> = Vec::new();

        for name in names {
            if name.trim().is_empty() {
                continue;
            }
            match Self::get_or_create(conn, name) {
                Ok(tag) => {
                    if !tags.iter().any(|t| t.name == tag.name) {
                        tags.push(tag);
                    }
                }
                Err(crate::StorageError::Validation(err)) => {
                    warn!(tag = %name, error = %err, "skipping invalid tag from AI output");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(tags)
    }

    /// Get a tag by exact name.
    pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<Tag>> {
        let mut stmt = conn.prepare("SELECT id, name FROM tags WHERE name = ?1")?;

        let tag = stmt
            .query_row([name], |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .ok();

        Ok(tag)
    }

    /// Get all tags, ordered by name.
    pub fn all(conn: &Connection) -> Result<Vec<Tag>> {
        let mut stmt = conn.prepare("SELECT id, name FROM tags ORDER BY name")?;

        let tags = stmt
            .query_map([], |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(tags)
    }

    /// Count all tags.
    pub fn count(conn: &Connection) -> Result<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Seed the baseline dangerous-tag vocabulary.
    /// Returns the number of tags actually created.
    pub fn seed(conn: &Connection) -> Result<usize> {
        let mut created = 0;
        for name in BASELINE_TAGS {
            let inserted = conn.execute(
                "INSERT INTO tags (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
                [name],
            )?;
            created += inserted;
        }

        debug!(created, "seeded baseline tags");
        Ok(created)
    }
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

    #[test]
    fn test_get_or_create_returns_same_identity() {
        let conn = setup_db();

        let first = TagsRepo::get_or_create(&conn, "pornography").unwrap();
        let second = TagsRepo::get_or_create(&conn, "pornography").unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(TagsRepo::count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_get_or_create_trims_whitespace() {
        let conn = setup_db();

        let tag = TagsRepo::get_or_create(&conn, "  violence  ").unwrap();
        assert_eq!(tag.name, "violence");

        let same = TagsRepo::get_or_create(&conn, "violence").unwrap();
        assert_eq!(tag.id, same.id);
    }

    #[test]
    fn test_get_or_create_is_case_sensitive() {
        let conn = setup_db();

        let lower = TagsRepo::get_or_create(&conn, "violence").unwrap();
        let upper = TagsRepo::get_or_create(&conn, "Violence").unwrap();
        assert_ne!(lower.id, upper.id);
    }

    #[test]
    fn test_get_or_create_rejects_invalid_names() {
        let conn = setup_db();

        assert!(TagsRepo::get_or_create(&conn, "   ").is_err());
        assert!(TagsRepo::get_or_create(&conn, &"x".repeat(51)).is_err());
    }

    #[test]
    fn test_bulk_skips_noise_and_deduplicates() {
        let conn = setup_db();

        let names = vec![
            "violence".to_string(),
            "  ".to_string(),
            "blood".to_string(),
            "violence".to_string(),
            "y".repeat(80),
        ];
        let tags = TagsRepo::bulk_get_or_create(&conn, &names).unwrap();

        let mut resolved: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
        resolved.sort_unstable();
        assert_eq!(resolved, vec!["blood", "violence"]);
        assert_eq!(TagsRepo::count(&conn).unwrap(), 2);
    }

    #[test]
    fn test_seed_is_idempotent() {
        let conn = setup_db();

        let created = TagsRepo::seed(&conn).unwrap();
        assert_eq!(created, BASELINE_TAGS.len());

        let again = TagsRepo::seed(&conn).unwrap();
        assert_eq!(again, 0);
        assert_eq!(TagsRepo::count(&conn).unwrap(), BASELINE_TAGS.len() as i64);
    }
}
