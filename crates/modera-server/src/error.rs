//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use modera_storage::WorkflowError;

/// API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Upload or moderator input failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] modera_core::ValidationError),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A second classification was attempted for the same content.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The text Q&A service is not configured.
    #[error("text service not configured")]
    ChatNotConfigured,

    /// Upstream AI service failure (the `/api/ask` pass-through has no
    /// fail-open policy, unlike classification).
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] modera_storage::StorageError),
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Validation(e) => ApiError::Validation(e),
            WorkflowError::NotFound(what) => ApiError::NotFound(what),
            WorkflowError::RecordExists(id) => {
                ApiError::Conflict(format!("moderation record already exists for content {id}"))
            }
            WorkflowError::Storage(e) => ApiError::Storage(e),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::ChatNotConfigured => (StatusCode::SERVICE_UNAVAILABLE, "not_configured"),
            ApiError::Upstream(_) => (StatusCode::INTERNAL_SERVER_ERROR, "upstream_error"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;
