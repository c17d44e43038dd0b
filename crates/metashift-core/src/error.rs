//! Core error types.

use thiserror::Error;

/// Destination catalog service errors.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// A catalog service request failed.
    #[error("catalog request failed: {message}")]
    Request {
        /// Service-reported failure detail.
        message: String,
    },
}

impl CatalogError {
    /// Request failure with the given detail.
    pub fn request(message: impl Into<String>) -> Self {
        CatalogError::Request { message: message.into() }
    }
}

/// Migration core errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Statement execution error.
    #[error("sql backend error: {0}")]
    Sql(#[from] metashift_sql::SqlError),

    /// Catalog service error.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Deep copy requested for a source that is not a Delta table.
    #[error("{object} is not a delta table: {format}")]
    UnsupportedFormat {
        /// Source object identity.
        object: String,
        /// Reported storage format.
        format: String,
    },

    /// View migration requested for an object without a definition.
    #[error("{object} has no view definition")]
    ViewDefinitionMissing {
        /// Source object identity.
        object: String,
    },

    /// One or more concurrent tasks failed. Raised only after every
    /// task has completed.
    #[error("{failed} of {total} {operation} tasks failed")]
    Tasks {
        /// Operation the tasks belonged to.
        operation: &'static str,
        /// Number of failed tasks.
        failed: usize,
        /// Number of tasks attempted.
        total: usize,
    },
}
