//! Validation errors raised before a request leaves the client.

use thiserror::Error;

/// Result type for validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Input rejected locally, without any transport call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The title is empty or whitespace only.
    #[error("title must not be blank")]
    EmptyTitle,

    /// The book id is empty or whitespace only.
    #[error("book id must not be blank")]
    EmptyId,
}
