//! Application state for the API server.

use std::path::PathBuf;
use std::sync::Arc;

use modera_core::{ChatClient, ClassificationGateway};
use modera_storage::{Database, ModerationWorkflow};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Arc<Database>,
    /// Moderation workflow bound to the database.
    pub workflow: ModerationWorkflow,
    /// External AI classification gateway.
    pub gateway: Arc<dyn ClassificationGateway>,
    /// Text Q&A client; `None` when no API key was configured.
    pub chat: Option<Arc<ChatClient>>,
    /// Directory uploaded media files are written to.
    pub media_dir: PathBuf,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        db: Database,
        gateway: Arc<dyn ClassificationGateway>,
        chat: Option<Arc<ChatClient>>,
        media_dir: impl Into<PathBuf>,
    ) -> Self {
        let workflow = db.workflow();
        Self {
            db: Arc::new(db),
            workflow,
            gateway,
            chat,
            media_dir: media_dir.into(),
        }
    }

    /// Creates state over an in-memory database (for testing).
    pub fn in_memory(gateway: Arc<dyn ClassificationGateway>, media_dir: impl Into<PathBuf>) -> Self {
        let db = Database::in_memory().expect("Failed to create in-memory database");
        Self::new(db, gateway, None, media_dir)
    }
}
