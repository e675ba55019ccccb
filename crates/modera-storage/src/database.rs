//! High-level database interface.

use std::path::PathBuf;

use directories::ProjectDirs;
use modera_core::{MediaKind, SafetyStatus};
use tracing::info;

use crate::error::{Result, StorageError};
use crate::models::{Content, ModerationRecord, NewContent, Tag};
use crate::pool::ConnectionPool;
use crate::repository::{ContentRepo, RecordsRepo, TagsRepo};
use crate::workflow::ModerationWorkflow;

/// High-level database interface for Modera.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Create a new database in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_db_path()?)
    }

    /// Create a new database at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {:?}", path);
        let pool = ConnectionPool::new(&path)?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory()?;
        Ok(Self { pool })
    }

    /// Get the default database path.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "modera", "modera")
            .ok_or_else(|| StorageError::Config("Could not determine app data directory".into()))?;

        Ok(proj_dirs.data_dir().join("modera.db"))
    }

    /// The moderation workflow bound to this database.
    pub fn workflow(&self) -> ModerationWorkflow {
        ModerationWorkflow::new(self.pool.clone())
    }

    // === Content ===

    /// Register an uploaded content item.
    pub fn create_content(&self, file_path: String, media_kind: MediaKind) -> Result<i64> {
        let conn = self.pool.get()?;
        ContentRepo::insert(
            &conn,
            NewContent {
                file_path,
                media_kind,
            },
        )
    }

    /// Get a content item by ID.
    pub fn get_content(&self, id: i64) -> Result<Option<Content>> {
        let conn = self.pool.get()?;
        ContentRepo::get_by_id(&conn, id)
    }

    /// Get all content with a given safety status.
    pub fn get_content_by_status(&self, status: SafetyStatus) -> Result<Vec<Content>> {
        let conn = self.pool.get()?;
        ContentRepo::get_by_status(&conn, status)
    }

    /// Count total content items.
    pub fn count_content(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        ContentRepo::count(&conn)
    }

    /// Delete a content item and its record.
    pub fn delete_content(&self, id: i64) -> Result<bool> {
        let conn = self.pool.get()?;
        ContentRepo::delete(&conn, id)
    }

    // === Records ===

    /// Get a moderation record by ID.
    pub fn get_record(&self, id: i64) -> Result<Option<ModerationRecord>> {
        let conn = self.pool.get()?;
        RecordsRepo::get_by_id(&conn, id)
    }

    /// Get the moderation record for a content item.
    pub fn get_record_for_content(&self, content_id: i64) -> Result<Option<ModerationRecord>> {
        let conn = self.pool.get()?;
        RecordsRepo::get_by_content_id(&conn, content_id)
    }

    // === Tags ===

    /// Get all registered tags.
    pub fn get_all_tags(&self) -> Result<Vec<Tag>> {
        let conn = self.pool.get()?;
        TagsRepo::all(&conn)
    }

    /// Seed the baseline dangerous-tag vocabulary. Idempotent.
    pub fn seed_tags(&self) -> Result<usize> {
        let conn = self.pool.get()?;
        TagsRepo::seed(&conn)
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::in_memory().expect("Failed to create in-memory database")
    }
}
