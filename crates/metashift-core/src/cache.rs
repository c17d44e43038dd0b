//! Crawl-or-load snapshot cache.
//!
//! One persisted table holds the latest snapshot of a typed record
//! set. Loading wins whenever the table exists, even empty; a missing
//! table triggers a live crawl whose result is persisted and
//! returned. This is the only cross-run memoization in the system.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use metashift_sql::{Row, SqlBackend, SqlError};
use tracing::debug;

use crate::error::Error;

/// Row conversion for records persisted by [`SnapshotCache`].
pub trait SnapshotRecord: Sized + Send {
    /// Column names and SQL types of the backing table, in order.
    fn columns() -> &'static [(&'static str, &'static str)];

    /// Renders the record as one row, cells in column order.
    fn to_row(&self) -> Row;

    /// Rebuilds the record from one loaded row.
    fn from_row(row: &Row) -> Result<Self, SqlError>;
}

/// Crawl-or-load cache over one persisted table.
///
/// The handle is owned by the component that needs it; there is no
/// process-wide registry of caches.
pub struct SnapshotCache<T> {
    backend: Arc<dyn SqlBackend>,
    full_name: String,
    _record: PhantomData<T>,
}

impl<T: SnapshotRecord> SnapshotCache<T> {
    /// Creates a cache backed by `schema.name`.
    pub fn new(backend: Arc<dyn SqlBackend>, schema: &str, name: &str) -> Self {
        Self {
            backend,
            full_name: format!("{schema}.{name}"),
            _record: PhantomData,
        }
    }

    /// Table the cache persists into.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Loads the cached snapshot, or rebuilds it with `crawl` when the
    /// cache table does not exist yet.
    ///
    /// A readable cache wins even when empty. Load failures other than
    /// a missing table propagate; the cache is never dropped on an
    /// ambiguous error.
    pub async fn snapshot<F, Fut>(&self, crawl: F) -> Result<Vec<T>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, Error>>,
    {
        match self.try_load().await {
            Ok(records) => Ok(records),
            Err(SqlError::NotFound { object }) => {
                debug!(table = %object, "cache table missing, crawling live");
                let records = crawl().await?;
                self.store(&records).await?;
                Ok(records)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn try_load(&self) -> Result<Vec<T>, SqlError> {
        let rows = self
            .backend
            .fetch(&format!("SELECT * FROM {}", self.full_name))
            .await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Replaces the table contents with `records`.
    async fn store(&self, records: &[T]) -> Result<(), Error> {
        let columns = T::columns();
        let ddl = columns
            .iter()
            .map(|(name, ty)| format!("{name} {ty}"))
            .collect::<Vec<_>>()
            .join(", ");
        self.backend
            .execute(&format!(
                "CREATE TABLE IF NOT EXISTS {} ({ddl})",
                self.full_name
            ))
            .await?;
        self.backend
            .execute(&format!("TRUNCATE TABLE {}", self.full_name))
            .await?;
        if records.is_empty() {
            return Ok(());
        }
        let names = columns
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ");
        let tuples = records
            .iter()
            .map(|record| {
                let row = record.to_row();
                let values = row.values().map(|v| v.literal()).collect::<Vec<_>>();
                format!("({})", values.join(", "))
            })
            .collect::<Vec<_>>()
            .join(", ");
        self.backend
            .execute(&format!(
                "INSERT INTO {} ({names}) VALUES {tuples}",
                self.full_name
            ))
            .await?;
        debug!(table = %self.full_name, count = records.len(), "snapshot persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use metashift_sql::{MockBackend, Value};

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        name: String,
        size: i64,
    }

    impl SnapshotRecord for Entry {
        fn columns() -> &'static [(&'static str, &'static str)] {
            &[("name", "STRING"), ("size", "BIGINT")]
        }

        fn to_row(&self) -> Row {
            Row::new().with("name", self.name.as_str()).with("size", self.size)
        }

        fn from_row(row: &Row) -> Result<Self, SqlError> {
            Ok(Entry {
                name: row.string("name")?.to_string(),
                size: row.int("size")?,
            })
        }
    }

    fn crawl_failure() -> Error {
        Error::Catalog(CatalogError::request("crawl must not run"))
    }

    #[tokio::test]
    async fn test_load_hit_skips_the_crawl() {
        let backend = Arc::new(MockBackend::new().with_rows(
            "SELECT * FROM inv.entries",
            vec![Row::new().with("name", "a").with("size", 1i64)],
        ));
        let cache = SnapshotCache::<Entry>::new(backend.clone(), "inv", "entries");
        let records = cache
            .snapshot(|| async { Err::<Vec<Entry>, _>(crawl_failure()) })
            .await
            .unwrap();
        assert_eq!(records, vec![Entry { name: "a".to_string(), size: 1 }]);
        assert_eq!(backend.queries(), vec!["SELECT * FROM inv.entries".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_but_present_table_wins() {
        let backend = Arc::new(MockBackend::new());
        let cache = SnapshotCache::<Entry>::new(backend.clone(), "inv", "entries");
        let records = cache
            .snapshot(|| async { Err::<Vec<Entry>, _>(crawl_failure()) })
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_missing_table_crawls_and_persists() {
        let backend = Arc::new(
            MockBackend::new().fail_on("SELECT * FROM inv.entries", SqlError::not_found("inv.entries")),
        );
        let cache = SnapshotCache::<Entry>::new(backend.clone(), "inv", "entries");
        let crawled = vec![
            Entry { name: "a".to_string(), size: 1 },
            Entry { name: "o'brien".to_string(), size: 2 },
        ];
        let returned = {
            let crawled = crawled.clone();
            cache.snapshot(move || async move { Ok(crawled) }).await.unwrap()
        };
        assert_eq!(returned, crawled);
        assert_eq!(
            backend.queries(),
            vec![
                "SELECT * FROM inv.entries".to_string(),
                "CREATE TABLE IF NOT EXISTS inv.entries (name STRING, size BIGINT)".to_string(),
                "TRUNCATE TABLE inv.entries".to_string(),
                "INSERT INTO inv.entries (name, size) VALUES ('a', 1), ('o''brien', 2)".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_table_with_empty_crawl_persists_nothing() {
        let backend = Arc::new(
            MockBackend::new().fail_on("SELECT * FROM inv.entries", SqlError::not_found("inv.entries")),
        );
        let cache = SnapshotCache::<Entry>::new(backend.clone(), "inv", "entries");
        let records = cache.snapshot(|| async { Ok(Vec::new()) }).await.unwrap();
        assert!(records.is_empty());
        assert!(backend.queries_matching("INSERT").is_empty());
        assert_eq!(backend.queries_matching("TRUNCATE").len(), 1);
    }

    #[tokio::test]
    async fn test_other_load_failures_propagate() {
        let backend = Arc::new(
            MockBackend::new().fail_on("SELECT * FROM inv.entries", SqlError::statement("timeout")),
        );
        let cache = SnapshotCache::<Entry>::new(backend.clone(), "inv", "entries");
        let err = cache
            .snapshot(|| async { Err::<Vec<Entry>, _>(crawl_failure()) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Sql(SqlError::Statement { .. })));
        assert_eq!(backend.queries().len(), 1);
    }

    #[tokio::test]
    async fn test_crawl_failure_propagates_without_persisting() {
        let backend = Arc::new(
            MockBackend::new().fail_on("SELECT * FROM inv.entries", SqlError::not_found("inv.entries")),
        );
        let cache = SnapshotCache::<Entry>::new(backend.clone(), "inv", "entries");
        let err = cache
            .snapshot(|| async { Err::<Vec<Entry>, _>(crawl_failure()) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Catalog(_)));
        assert!(backend.queries_matching("CREATE TABLE").is_empty());
    }

    #[tokio::test]
    async fn test_malformed_cached_row_is_fatal() {
        let backend = Arc::new(MockBackend::new().with_rows(
            "SELECT * FROM inv.entries",
            vec![Row::new().with("name", Value::Null)],
        ));
        let cache = SnapshotCache::<Entry>::new(backend, "inv", "entries");
        let err = cache
            .snapshot(|| async { Err::<Vec<Entry>, _>(crawl_failure()) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Sql(SqlError::MalformedRow { .. })));
    }
}
