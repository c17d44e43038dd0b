//! Metastore migration walkthrough.
//!
//! Drives a full migrate / report / revert cycle over an in-memory
//! estate and prints every statement the orchestrator issues. No real
//! platform is contacted; the recording mock backend stands in for it.
//!
//! Run with: cargo run
//! Set RUST_LOG=metashift_core=debug to watch the orchestrator's own
//! structured events interleave with the output.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use metashift_core::catalog::{CatalogClient, CatalogInfo, ObjectInfo, SchemaInfo};
use metashift_core::error::{CatalogError, Error};
use metashift_core::inventory::{
    MetastoreObject, MigrationStrategy, ObjectInventory, ObjectType, PROP_UPGRADED_FROM,
};
use metashift_core::mapping::{ObjectMapping, ObjectToMigrate, Rule};
use metashift_core::migrate::{Migrator, MigratorConfig};
use metashift_core::status::MigrationStatusRefresher;
use metashift_sql::{MockBackend, Row};

struct DemoCatalog {
    objects: Vec<ObjectInfo>,
}

#[async_trait]
impl CatalogClient for DemoCatalog {
    async fn list_catalogs(&self) -> Result<Vec<CatalogInfo>, CatalogError> {
        Ok(vec![CatalogInfo { name: "main".to_string() }])
    }

    async fn list_schemas(&self, catalog: &str) -> Result<Vec<SchemaInfo>, CatalogError> {
        Ok(vec![SchemaInfo { catalog: catalog.to_string(), name: "sales".to_string() }])
    }

    async fn list_objects(
        &self,
        _catalog: &str,
        _schema: &str,
    ) -> Result<Vec<ObjectInfo>, CatalogError> {
        Ok(self.objects.clone())
    }

    async fn workspace_id(&self) -> Result<u64, CatalogError> {
        Ok(7451098)
    }
}

struct DemoInventory(Vec<MetastoreObject>);

#[async_trait]
impl ObjectInventory for DemoInventory {
    async fn snapshot(&self) -> Result<Vec<MetastoreObject>, Error> {
        Ok(self.0.clone())
    }
}

struct DemoMapping(Vec<ObjectToMigrate>);

#[async_trait]
impl ObjectMapping for DemoMapping {
    async fn get_rules(
        &self,
        _inventory: &[MetastoreObject],
    ) -> Result<Vec<ObjectToMigrate>, Error> {
        Ok(self.0.clone())
    }
}

/// Three migratable objects plus one the crawler could not classify.
fn estate() -> Vec<MetastoreObject> {
    vec![
        MetastoreObject {
            catalog: "metastore".to_string(),
            database: "sales".to_string(),
            name: "orders".to_string(),
            object_type: ObjectType::Managed,
            table_format: "DELTA".to_string(),
            location: Some("dbfs:/root/sales/orders".to_string()),
            view_text: None,
            strategy: MigrationStrategy::DeepCopy,
            upgraded_to: None,
        },
        MetastoreObject {
            catalog: "metastore".to_string(),
            database: "sales".to_string(),
            name: "leads".to_string(),
            object_type: ObjectType::External,
            table_format: "DELTA".to_string(),
            location: Some("s3://bucket/sales/leads".to_string()),
            view_text: None,
            strategy: MigrationStrategy::MetadataSync,
            upgraded_to: None,
        },
        MetastoreObject {
            catalog: "metastore".to_string(),
            database: "sales".to_string(),
            name: "recent".to_string(),
            object_type: ObjectType::View,
            table_format: "VIEW".to_string(),
            location: None,
            view_text: Some("SELECT * FROM sales.orders WHERE amount > 100".to_string()),
            strategy: MigrationStrategy::ViewRedefine,
            upgraded_to: None,
        },
        MetastoreObject {
            catalog: "metastore".to_string(),
            database: "sales".to_string(),
            name: "scratch".to_string(),
            object_type: ObjectType::Managed,
            table_format: "HIVE".to_string(),
            location: None,
            view_text: None,
            strategy: MigrationStrategy::Unsupported,
            upgraded_to: None,
        },
    ]
}

/// Every object keeps its schema and name under the `main` catalog.
fn pairs(objects: &[MetastoreObject]) -> Vec<ObjectToMigrate> {
    objects
        .iter()
        .map(|object| ObjectToMigrate {
            object: object.clone(),
            rule: Rule {
                catalog: "main".to_string(),
                src_schema: object.database.clone(),
                dst_schema: object.database.clone(),
                src_table: object.name.clone(),
                dst_table: object.name.clone(),
            },
        })
        .collect()
}

/// Destination listing as the catalog reports it after `object` landed.
fn migrated_listing(object: &MetastoreObject) -> ObjectInfo {
    ObjectInfo {
        name: object.name.clone(),
        full_name: Some(format!("main.{}.{}", object.database, object.name)),
        properties: HashMap::from([(PROP_UPGRADED_FROM.to_string(), object.key())]),
    }
}

fn build(
    inventory: Vec<MetastoreObject>,
    listings: Vec<ObjectInfo>,
) -> (Arc<MockBackend>, Migrator) {
    let backend = Arc::new(MockBackend::new().with_rows(
        "SYNC TABLE",
        vec![Row::new().with("status_code", "SUCCESS").with("description", "")],
    ));
    let catalog = Arc::new(DemoCatalog { objects: listings });
    let rules = pairs(&inventory);
    let inventory = Arc::new(DemoInventory(inventory));
    let refresher = Arc::new(MigrationStatusRefresher::new(
        catalog.clone(),
        backend.clone(),
        inventory.clone(),
        "ucx",
    ));
    let migrator = Migrator::new(
        inventory,
        Arc::new(DemoMapping(rules)),
        catalog,
        backend.clone(),
        refresher,
        MigratorConfig::new().with_max_tasks(4),
    );
    (backend, migrator)
}

fn banner(title: &str) {
    println!();
    println!("=== {title} ===");
    println!();
}

fn print_statements(backend: &MockBackend) {
    let queries = backend.queries();
    if queries.is_empty() {
        println!("  (no statements issued)");
        return;
    }
    for (i, query) in queries.iter().enumerate() {
        println!("  {:>2}. {query}", i + 1);
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    banner("first migration run over a fresh estate");
    let (backend, migrator) = build(estate(), vec![]);
    migrator.migrate(None).await?;
    print_statements(&backend);

    // the external crawler refreshes the inventory after a run, so the
    // later phases see the recorded destinations on both sides
    let migrated: Vec<MetastoreObject> = estate()
        .into_iter()
        .map(|mut object| {
            if object.strategy != MigrationStrategy::Unsupported {
                object.upgraded_to =
                    Some(format!("main.{}.{}", object.database, object.name));
            }
            object
        })
        .collect();
    let listings: Vec<ObjectInfo> = migrated
        .iter()
        .filter(|object| object.upgraded_to.is_some())
        .map(migrated_listing)
        .collect();

    banner("second run against the already-migrated estate");
    let (backend, migrator) = build(migrated.clone(), listings.clone());
    migrator.migrate(None).await?;
    print_statements(&backend);

    banner("what a revert would touch");
    migrator.revert_report(false).await?;

    banner("revert, keeping the deep-copied destination");
    let (backend, migrator) = build(migrated, listings);
    migrator.revert(Some("sales"), None, false).await?;
    print_statements(&backend);

    Ok(())
}
