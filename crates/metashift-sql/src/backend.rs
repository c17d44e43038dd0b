//! Statement execution backend trait.

use async_trait::async_trait;

use crate::error::SqlError;
use crate::row::Row;

/// Executes SQL statements against the data platform.
///
/// One handle is shared by many concurrent migration tasks, so
/// implementations must tolerate concurrent calls (a session per
/// statement or an internally synchronized connection).
#[async_trait]
pub trait SqlBackend: Send + Sync {
    /// Runs a statement that returns no rows.
    async fn execute(&self, statement: &str) -> Result<(), SqlError>;

    /// Runs a statement and returns its result rows.
    async fn fetch(&self, statement: &str) -> Result<Vec<Row>, SqlError>;
}
