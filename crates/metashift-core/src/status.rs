//! Migration status reconciliation.
//!
//! The refresher reconciles two independently mutable inventories: the
//! source metastore (via the inventory crawler) and the destination
//! catalog (via live property tags). The result is one
//! [`MigrationStatus`] per source object, memoized through the
//! snapshot cache.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use metashift_sql::{Row, SqlBackend, SqlError, Value};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{SnapshotCache, SnapshotRecord};
use crate::catalog::CatalogClient;
use crate::error::Error;
use crate::inventory::{MetastoreObject, ObjectInventory, PROP_UPGRADED_FROM, PROP_UPGRADED_TO};

/// Destination identity to source identity, both lower-cased, for
/// every destination object currently tagged as migrated.
pub type SeenObjects = HashMap<String, String>;

/// Inverts a seen-objects index into source-to-destination form.
pub fn invert_index(index: &SeenObjects) -> SeenObjects {
    index
        .iter()
        .map(|(destination, source)| (source.clone(), destination.clone()))
        .collect()
}

/// Reconciled migration state of one source object.
///
/// Destination fields are set only when destination-side inspection
/// confirmed the migration at refresh time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationStatus {
    pub src_schema: String,
    pub src_table: String,
    pub dst_catalog: Option<String>,
    pub dst_schema: Option<String>,
    pub dst_table: Option<String>,
    /// When this record was computed.
    pub update_ts: DateTime<Utc>,
}

impl MigrationStatus {
    fn unconfirmed(object: &MetastoreObject) -> Self {
        MigrationStatus {
            src_schema: object.database.clone(),
            src_table: object.name.clone(),
            dst_catalog: None,
            dst_schema: None,
            dst_table: None,
            update_ts: Utc::now(),
        }
    }
}

fn opt_cell(value: &Option<String>) -> Value {
    match value {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

impl SnapshotRecord for MigrationStatus {
    fn columns() -> &'static [(&'static str, &'static str)] {
        &[
            ("src_schema", "STRING"),
            ("src_table", "STRING"),
            ("dst_catalog", "STRING"),
            ("dst_schema", "STRING"),
            ("dst_table", "STRING"),
            ("update_ts", "STRING"),
        ]
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.push("src_schema", Value::Text(self.src_schema.clone()));
        row.push("src_table", Value::Text(self.src_table.clone()));
        row.push("dst_catalog", opt_cell(&self.dst_catalog));
        row.push("dst_schema", opt_cell(&self.dst_schema));
        row.push("dst_table", opt_cell(&self.dst_table));
        row.push("update_ts", Value::Text(self.update_ts.to_rfc3339()));
        row
    }

    fn from_row(row: &Row) -> Result<Self, SqlError> {
        let ts = row.string("update_ts")?;
        let update_ts = DateTime::parse_from_rfc3339(ts)
            .map_err(|e| SqlError::malformed(format!("update_ts: {e}")))?
            .with_timezone(&Utc);
        Ok(MigrationStatus {
            src_schema: row.string("src_schema")?.to_string(),
            src_table: row.string("src_table")?.to_string(),
            dst_catalog: row.opt_string("dst_catalog")?.map(str::to_string),
            dst_schema: row.opt_string("dst_schema")?.map(str::to_string),
            dst_table: row.opt_string("dst_table")?.map(str::to_string),
            update_ts,
        })
    }
}

/// Reconciles the source inventory against live destination tags.
pub struct MigrationStatusRefresher {
    catalog: Arc<dyn CatalogClient>,
    backend: Arc<dyn SqlBackend>,
    inventory: Arc<dyn ObjectInventory>,
    cache: SnapshotCache<MigrationStatus>,
}

impl MigrationStatusRefresher {
    /// Cache table name under the inventory schema.
    pub const CACHE_TABLE: &'static str = "migration_status";

    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        backend: Arc<dyn SqlBackend>,
        inventory: Arc<dyn ObjectInventory>,
        inventory_schema: &str,
    ) -> Self {
        let cache = SnapshotCache::new(Arc::clone(&backend), inventory_schema, Self::CACHE_TABLE);
        Self { catalog, backend, inventory, cache }
    }

    /// Scans every destination catalog and schema for objects tagged
    /// as migrated.
    ///
    /// Full scan on every call. Callers that need freshness call this
    /// once per logical run and reuse the result for the run's
    /// duration.
    pub async fn seen_objects(&self) -> Result<SeenObjects, Error> {
        let mut seen = SeenObjects::new();
        for catalog in self.catalog.list_catalogs().await? {
            for schema in self.catalog.list_schemas(&catalog.name).await? {
                let objects = self.catalog.list_objects(&schema.catalog, &schema.name).await?;
                for object in objects {
                    let Some(source) = object.properties.get(PROP_UPGRADED_FROM) else {
                        continue;
                    };
                    match &object.full_name {
                        Some(full_name) => {
                            seen.insert(full_name.to_lowercase(), source.to_lowercase());
                        }
                        None => warn!(
                            object = %object.name,
                            catalog = %schema.catalog,
                            schema = %schema.name,
                            "tagged object has no full name, skipping"
                        ),
                    }
                }
            }
        }
        debug!(count = seen.len(), "destination scan complete");
        Ok(seen)
    }

    /// Live point check: does this source object carry a migrated-to
    /// tag right now?
    ///
    /// Independent of the bulk index; used to confirm bulk results and
    /// for on-demand single-object queries.
    pub async fn is_upgraded(&self, schema: &str, object: &str) -> Result<bool, Error> {
        let rows = self
            .backend
            .fetch(&format!("SHOW TBLPROPERTIES {schema}.{object}"))
            .await?;
        for row in &rows {
            if row.string("key")? == PROP_UPGRADED_TO {
                info!("object {schema}.{object} is marked as upgraded");
                return Ok(true);
            }
        }
        info!("object {schema}.{object} is not marked as upgraded");
        Ok(false)
    }

    /// Current status snapshot, one record per source object.
    pub async fn snapshot(&self) -> Result<Vec<MigrationStatus>, Error> {
        self.cache.snapshot(|| self.crawl()).await
    }

    async fn crawl(&self) -> Result<Vec<MigrationStatus>, Error> {
        let objects = self.inventory.snapshot().await?;
        let seen = self.seen_objects().await?;
        let reverse = invert_index(&seen);
        let mut statuses = Vec::with_capacity(objects.len());
        for object in &objects {
            statuses.push(self.reconcile_one(object, &reverse).await?);
        }
        Ok(statuses)
    }

    /// Destination fields are attached only when the inverted index
    /// and the point check agree; requiring both reduces false
    /// positives from tags removed after the bulk scan.
    async fn reconcile_one(
        &self,
        object: &MetastoreObject,
        reverse: &SeenObjects,
    ) -> Result<MigrationStatus, Error> {
        let mut status = MigrationStatus::unconfirmed(object);
        let Some(destination) = reverse.get(&object.key()) else {
            return Ok(status);
        };
        if !self.is_upgraded(&object.database, &object.name).await? {
            return Ok(status);
        }
        let parts: Vec<&str> = destination.split('.').collect();
        if parts.len() == 3 {
            status.dst_catalog = Some(parts[0].to_string());
            status.dst_schema = Some(parts[1].to_string());
            status.dst_table = Some(parts[2].to_string());
        } else {
            warn!(
                object = %object.key(),
                destination = %destination,
                "destination identity is not a three-part name, leaving status unset"
            );
        }
        Ok(status)
    }
}
