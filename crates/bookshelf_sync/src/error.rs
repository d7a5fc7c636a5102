//! Error types for the collection client and store.

use bookshelf_protocol::{BookId, ValidationError};
use thiserror::Error;

/// Result type for transport calls.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A transport call that did not complete successfully.
///
/// Raised uncooked by every [`RemoteCollectionClient`](crate::RemoteCollectionClient)
/// implementation. Each variant corresponds to exactly one failed attempt;
/// nothing in this crate retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request never got an HTTP response (connection refused, DNS,
    /// timeout, reset).
    #[error("server unreachable: {message}")]
    Unreachable {
        /// Underlying error message.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("server rejected request with status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The addressed book does not exist remotely.
    #[error("book {0} not found")]
    NotFound(BookId),

    /// The response body did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The client could not be built from its configuration.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl TransportError {
    /// Creates an unreachable error.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Creates a status error.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Returns true if the addressed book is unknown to the server.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound(_))
    }

    /// Returns true if no response was received at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, TransportError::Unreachable { .. })
    }

    /// Returns true if the server answered but refused the request.
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            TransportError::Status { .. } | TransportError::NotFound(_)
        )
    }
}

/// Errors returned by [`CollectionStore`](crate::CollectionStore) operations.
///
/// A store operation that returns an error has left the mirror unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Input was rejected before any transport call.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The transport call failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl StoreError {
    /// Returns true if the intent was rejected locally.
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }

    /// Returns true if the addressed book is unknown to the server.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Transport(e) if e.is_not_found())
    }

    /// Returns the transport error, if this was one.
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            StoreError::Transport(e) => Some(e),
            StoreError::Validation(_) => None,
        }
    }
}
