//! Modera Storage - SQLite persistence and the moderation workflow.
//!
//! Provides:
//! - Schema and versioned migrations
//! - A thread-safe connection pool
//! - Repositories for content, moderation records, and the tag registry
//! - The [`ModerationWorkflow`] state machine tying them together

pub mod database;
pub mod error;
pub mod models;
pub mod pool;
pub mod repository;
pub mod schema;
pub mod workflow;

pub use database::Database;
pub use error::{Result, StorageError};
pub use models::{Content, ModerationRecord, NewContent, NewModerationRecord, StatusCounts, Tag};
pub use pool::ConnectionPool;
pub use repository::{ContentRepo, RecordsRepo, TagsRepo};
pub use workflow::{
    ClassifyOutcome, ContentStatus, Dashboard, ModerationWorkflow, StatusBucket, WorkflowError,
};
