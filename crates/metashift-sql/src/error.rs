//! SQL backend error types.

use thiserror::Error;

/// Errors surfaced by statement execution backends.
#[derive(Debug, Clone, Error)]
pub enum SqlError {
    /// The referenced relation does not exist.
    #[error("not found: {object}")]
    NotFound {
        /// Identity of the missing relation.
        object: String,
    },

    /// The backend rejected a statement or it failed remotely.
    /// Timeouts land here as well.
    #[error("statement failed: {message}")]
    Statement {
        /// Backend-reported failure detail.
        message: String,
    },

    /// A result row did not match the shape the caller expected.
    #[error("malformed row: {message}")]
    MalformedRow {
        /// What was missing or mistyped.
        message: String,
    },
}

impl SqlError {
    /// Not-found error for the given relation.
    pub fn not_found(object: impl Into<String>) -> Self {
        SqlError::NotFound { object: object.into() }
    }

    /// Statement failure with the given detail.
    pub fn statement(message: impl Into<String>) -> Self {
        SqlError::Statement { message: message.into() }
    }

    /// Malformed-row error with the given detail.
    pub fn malformed(message: impl Into<String>) -> Self {
        SqlError::MalformedRow { message: message.into() }
    }
}
