//! Metashift Core - Migration orchestration and status reconciliation.
//!
//! This crate coordinates the migration of tables and views out of a
//! legacy metastore into a destination catalog service. It classifies
//! objects by strategy, applies each strategy at most once across
//! repeated runs, reconciles the source inventory against live
//! destination tags into a status snapshot, and supports reverting a
//! migration. The catalog service, SQL backend, inventory crawler,
//! and rule mapper are external collaborators consumed through
//! traits.

pub mod cache;
pub mod catalog;
pub mod error;
pub mod inventory;
pub mod mapping;
pub mod migrate;
pub mod status;
mod tasks;

pub use cache::{SnapshotCache, SnapshotRecord};
pub use catalog::{CatalogClient, CatalogInfo, ObjectInfo, SchemaInfo};
pub use error::{CatalogError, Error};
pub use inventory::{
    MetastoreObject, MigrationStrategy, ObjectInventory, ObjectKind, ObjectType,
    PROP_UPGRADED_FROM, PROP_UPGRADED_TO, PROP_WORKSPACE_ID,
};
pub use mapping::{ObjectMapping, ObjectToMigrate, Rule};
pub use migrate::{MigrationCount, Migrator, MigratorConfig, SyncOutcome};
pub use status::{invert_index, MigrationStatus, MigrationStatusRefresher, SeenObjects};

/// Re-export the statement execution surface.
pub use metashift_sql as sql;
