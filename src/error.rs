/// Unified error types for the noteboard backend
use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum NoteboardError {
    /// Missing or malformed client input
    #[error("{0}")]
    BadRequest(String),

    /// Missing blob or record
    #[error("{0}")]
    NotFound(String),

    /// Route exists but not for this method
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Request body over the configured limit
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Blob storage errors
    #[error("Blob storage error: {0}")]
    BlobStorage(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<MultipartError> for NoteboardError {
    fn from(err: MultipartError) -> Self {
        NoteboardError::rejected(
            err.status(),
            format!("Malformed multipart body: {}", err.body_text()),
        )
    }
}

/// Error body returned on every non-2xx response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl NoteboardError {
    /// Map an extractor rejection: an oversized body keeps its 413, anything
    /// else the client sent wrong is a 400.
    pub fn rejected(status: StatusCode, message: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            NoteboardError::PayloadTooLarge(message)
        } else {
            NoteboardError::BadRequest(message)
        }
    }

    /// HTTP status and stable error code for this error
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            NoteboardError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            NoteboardError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            NoteboardError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "MethodNotAllowed")
            }
            NoteboardError::PayloadTooLarge(_) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PayloadTooLarge")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError"),
        }
    }
}

impl IntoResponse for NoteboardError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status();

        let message = if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
            "Internal server error".to_string() // Don't leak details
        } else {
            self.to_string()
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for noteboard operations
pub type NoteboardResult<T> = Result<T, NoteboardError>;
