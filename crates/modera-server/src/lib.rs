//! Modera Server - HTTP API server.
//!
//! This crate provides the HTTP API for the Modera moderation platform.
//!
//! ## Endpoints
//!
//! - `POST /api/upload` - Upload media, classify it, and return the verdict
//! - `GET /api/content/{id}/status` - Current classification for an item
//! - `GET /api/moderator/dashboard` - Content grouped per safety bucket
//! - `POST /api/content/{id}/update-status` - Administrative status change
//! - `GET /api/moderator/review-queue` - Content items needing review
//! - `GET /api/moderator/unverified` - Records awaiting review
//! - `POST /api/moderation/{id}/verify` - Mark a record as reviewed
//! - `POST /api/content/{id}/tags` - Update the moderator annotation
//! - `POST /api/content/{id}/finalize` - Authoritative moderator override
//! - `POST /api/ask` - Text Q&A pass-through
//! - `GET /api/health` - Liveness check
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use modera_core::{OpenAiVisionGateway, VisionConfig};
//! use modera_server::{AppState, Server, ServerConfig};
//! use modera_storage::Database;
//!
//! #[tokio::main]
//! async fn main() {
//!     let db = Database::in_memory().unwrap();
//!     let gateway = Arc::new(OpenAiVisionGateway::new(VisionConfig::new("sk-...")).unwrap());
//!     let state = AppState::new(db, gateway, None, "media");
//!     let server = Server::with_state(ServerConfig::default(), state).unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod error;
mod handlers;
pub mod models;
pub mod state;

use std::net::SocketAddr;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use modera_core::MAX_UPLOAD_SIZE;

pub use error::{ApiError, Result};
pub use state::AppState;

/// Default server port.
pub const DEFAULT_PORT: u16 = 48870;

/// Default server host (localhost only).
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1).
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Sets the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {0}: {1}")]
    BindError(SocketAddr, std::io::Error),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] modera_storage::StorageError),

    /// Server runtime error.
    #[error("server error: {0}")]
    Runtime(String),
}

/// The HTTP API server.
pub struct Server {
    router: Router,
    addr: SocketAddr,
}

/// Build the API router for the given state.
fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/api/upload", post(handlers::upload_content))
        .route("/api/content/{id}/status", get(handlers::get_content_status))
        .route("/api/moderator/dashboard", get(handlers::get_dashboard))
        .route(
            "/api/content/{id}/update-status",
            post(handlers::update_status),
        )
        .route(
            "/api/moderator/review-queue",
            get(handlers::get_review_queue),
        )
        .route("/api/moderator/unverified", get(handlers::get_unverified))
        .route("/api/moderation/{id}/verify", post(handlers::verify_record))
        .route("/api/content/{id}/tags", post(handlers::annotate_content))
        .route("/api/content/{id}/finalize", post(handlers::finalize_review))
        .route("/api/ask", post(handlers::ask_question))
        .route("/api/health", get(handlers::health))
        // Headroom over the domain limit so oversized uploads reach the
        // validator and get a clean 400 instead of a connection error
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + 64 * 1024))
        .with_state(state)
}

impl Server {
    /// Creates a server with the given configuration and state.
    pub fn with_state(
        config: ServerConfig,
        state: AppState,
    ) -> std::result::Result<Self, ServerError> {
        // CORS for the moderator web UI
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let router = api_router(state).layer(cors);

        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| ServerError::Runtime(format!("invalid address: {}", e)))?;

        Ok(Self { router, addr })
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Runs the server until shutdown.
    pub async fn run(self) -> std::result::Result<(), ServerError> {
        info!("Starting Modera API server on {}", self.addr);

        // SO_REUSEADDR so restarts work even with lingering sockets
        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .set_reuse_address(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .bind(&self.addr.into())
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .listen(128)
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = tokio::net::TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        axum::serve(listener, self.router)
            .await
            .map_err(|e| ServerError::Runtime(e.to_string()))?;

        Ok(())
    }

    /// Returns the router for testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}
