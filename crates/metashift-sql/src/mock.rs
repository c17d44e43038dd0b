//! Recording backend double for tests.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::backend::SqlBackend;
use crate::error::SqlError;
use crate::row::Row;

/// In-memory [`SqlBackend`] that records every statement and serves
/// canned rows.
///
/// Canned rows and injected failures are matched by substring against
/// the submitted statement; the first match in registration order
/// wins. A `fetch` with no matching rows returns an empty result, the
/// same as querying an empty relation.
#[derive(Default)]
pub struct MockBackend {
    rows: Vec<(String, Vec<Row>)>,
    failures: Vec<(String, SqlError)>,
    queries: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers canned rows for statements containing `needle`.
    pub fn with_rows(mut self, needle: &str, rows: Vec<Row>) -> Self {
        self.rows.push((needle.to_string(), rows));
        self
    }

    /// Injects a failure for statements containing `needle`.
    pub fn fail_on(mut self, needle: &str, error: SqlError) -> Self {
        self.failures.push((needle.to_string(), error));
        self
    }

    /// Every statement submitted so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    /// Submitted statements containing `needle`.
    pub fn queries_matching(&self, needle: &str) -> Vec<String> {
        self.queries
            .lock()
            .iter()
            .filter(|q| q.contains(needle))
            .cloned()
            .collect()
    }

    fn record(&self, statement: &str) -> Result<(), SqlError> {
        self.queries.lock().push(statement.to_string());
        for (needle, error) in &self.failures {
            if statement.contains(needle.as_str()) {
                return Err(error.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SqlBackend for MockBackend {
    async fn execute(&self, statement: &str) -> Result<(), SqlError> {
        self.record(statement)
    }

    async fn fetch(&self, statement: &str) -> Result<Vec<Row>, SqlError> {
        self.record(statement)?;
        for (needle, rows) in &self.rows {
            if statement.contains(needle.as_str()) {
                return Ok(rows.clone());
            }
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_statements_in_order() {
        let backend = MockBackend::new();
        backend.execute("CREATE TABLE t (a STRING)").await.unwrap();
        backend.fetch("SELECT * FROM t").await.unwrap();
        assert_eq!(
            backend.queries(),
            vec!["CREATE TABLE t (a STRING)".to_string(), "SELECT * FROM t".to_string()]
        );
    }

    #[tokio::test]
    async fn test_canned_rows_matched_by_substring() {
        let backend = MockBackend::new()
            .with_rows("FROM t", vec![Row::new().with("a", "x")])
            .with_rows("FROM u", vec![Row::new().with("a", "y")]);
        let rows = backend.fetch("SELECT * FROM u").await.unwrap();
        assert_eq!(rows[0].string("a").unwrap(), "y");
        let rows = backend.fetch("SELECT * FROM v").await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_first_registration_wins() {
        let backend = MockBackend::new()
            .with_rows("FROM t", vec![Row::new().with("a", "first")])
            .with_rows("SELECT * FROM t", vec![Row::new().with("a", "second")]);
        let rows = backend.fetch("SELECT * FROM t").await.unwrap();
        assert_eq!(rows[0].string("a").unwrap(), "first");
    }

    #[tokio::test]
    async fn test_injected_failure_applies_to_both_calls() {
        let backend = MockBackend::new().fail_on("FROM missing", SqlError::not_found("missing"));
        let err = backend.fetch("SELECT * FROM missing").await.unwrap_err();
        assert!(matches!(err, SqlError::NotFound { .. }));
        let err = backend.execute("DELETE FROM missing").await.unwrap_err();
        assert!(matches!(err, SqlError::NotFound { .. }));
        assert_eq!(backend.queries().len(), 2);
    }

    #[tokio::test]
    async fn test_queries_matching_filters() {
        let backend = MockBackend::new();
        backend.execute("ALTER TABLE a SET X").await.unwrap();
        backend.execute("DROP TABLE a").await.unwrap();
        assert_eq!(backend.queries_matching("ALTER").len(), 1);
    }
}
