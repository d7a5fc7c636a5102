//! Error types for the collection server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bookshelf_protocol::BookId;
use serde_json::json;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the collection server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request body or parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No book with this id.
    #[error("book {0} not found")]
    NotFound(BookId),

    /// The database file could not be read or written as JSON.
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidRequest(_) | ServerError::NotFound(_)
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(self, ServerError::Storage(_) | ServerError::Io(_))
    }

    /// Returns the HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Storage(_) | ServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.to_string() });
        (self.status_code(), Json(body)).into_response()
    }
}
