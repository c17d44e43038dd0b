//! Migration orchestration.
//!
//! [`Migrator`] drives one estate through migration, reversal, and
//! reporting. It consumes the inventory and rule mapping, dispatches
//! one strategy per object, enforces at-most-once application through
//! the refresher's seen-objects index, and runs per-object tasks
//! concurrently with isolated failures.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use metashift_sql::{Row, SqlBackend, SqlError};
use tracing::{debug, error, info, warn};

use crate::catalog::CatalogClient;
use crate::error::Error;
use crate::inventory::{
    MetastoreObject, MigrationStrategy, ObjectInventory, ObjectKind, ObjectType,
};
use crate::mapping::ObjectMapping;
use crate::status::{invert_index, MigrationStatusRefresher, SeenObjects};
use crate::tasks;

/// Orchestrator tuning.
#[derive(Debug, Clone)]
pub struct MigratorConfig {
    /// Maximum number of per-object tasks in flight.
    pub max_tasks: usize,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self { max_tasks: default_max_tasks() }
    }
}

impl MigratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bounded fan-out width.
    pub fn with_max_tasks(mut self, max_tasks: usize) -> Self {
        self.max_tasks = max_tasks.max(1);
        self
    }
}

fn default_max_tasks() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

/// Structured result of the metadata-only registration primitive.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub status_code: String,
    pub description: String,
}

impl SyncOutcome {
    /// Reads the outcome from the first result row.
    pub fn from_rows(rows: &[Row]) -> Result<Self, SqlError> {
        let Some(row) = rows.first() else {
            return Err(SqlError::malformed("sync returned no result rows"));
        };
        Ok(SyncOutcome {
            status_code: row.string("status_code")?.to_string(),
            description: row.opt_string("description")?.unwrap_or_default().to_string(),
        })
    }

    pub fn is_success(&self) -> bool {
        self.status_code == "SUCCESS"
    }
}

/// Per-schema count of migrated objects broken down by strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationCount {
    pub database: String,
    pub by_strategy: HashMap<MigrationStrategy, usize>,
}

impl MigrationCount {
    pub fn get(&self, strategy: MigrationStrategy) -> usize {
        self.by_strategy.get(&strategy).copied().unwrap_or(0)
    }
}

/// Coordinates migration, reversal, and reporting over one estate.
///
/// The seen-objects index is loaded once at the start of every
/// top-level operation and never updated mid-run: objects migrated
/// during a run are not re-detected as already migrated within the
/// same pass. Safe because the mapping yields one rule per source
/// identity per run, so no two tasks target the same destination.
pub struct Migrator {
    inventory: Arc<dyn ObjectInventory>,
    mapping: Arc<dyn ObjectMapping>,
    catalog: Arc<dyn CatalogClient>,
    backend: Arc<dyn SqlBackend>,
    refresher: Arc<MigrationStatusRefresher>,
    config: MigratorConfig,
}

impl Migrator {
    pub fn new(
        inventory: Arc<dyn ObjectInventory>,
        mapping: Arc<dyn ObjectMapping>,
        catalog: Arc<dyn CatalogClient>,
        backend: Arc<dyn SqlBackend>,
        refresher: Arc<MigrationStatusRefresher>,
        config: MigratorConfig,
    ) -> Self {
        Self { inventory, mapping, catalog, backend, refresher, config }
    }

    /// Migrates every mapped object whose strategy matches `filter`,
    /// or all of them when unfiltered.
    ///
    /// Fails only after every task has completed, with the count of
    /// failed objects; partial successes stay migrated.
    pub async fn migrate(&self, filter: Option<MigrationStrategy>) -> Result<(), Error> {
        let seen = self.refresher.seen_objects().await?;
        let inventory = self.inventory.snapshot().await?;
        let pairs = self.mapping.get_rules(&inventory).await?;
        let mut tasks = Vec::new();
        for pair in &pairs {
            if let Some(strategy) = filter {
                if pair.object.strategy != strategy {
                    continue;
                }
            }
            tasks.push(self.migrate_one(&pair.object, pair.rule.destination_key(), &seen));
        }
        info!(total = tasks.len(), "starting migration tasks");
        tasks::run_all("migrate", self.config.max_tasks, tasks).await?;
        Ok(())
    }

    async fn migrate_one(
        &self,
        object: &MetastoreObject,
        destination: String,
        seen: &SeenObjects,
    ) -> Result<bool, Error> {
        if seen.contains_key(&destination) {
            info!("{} is already migrated to {destination}, skipping", object.key());
            return Ok(true);
        }
        match object.strategy {
            MigrationStrategy::DeepCopy => self.migrate_deep_copy(object, &destination).await,
            MigrationStrategy::MetadataSync => {
                self.migrate_metadata_sync(object, &destination).await
            }
            MigrationStrategy::ViewRedefine => self.migrate_view(object, &destination).await,
            MigrationStrategy::Unsupported => {
                debug!("{} has no migration strategy, skipping", object.key());
                Ok(true)
            }
        }
    }

    async fn migrate_deep_copy(
        &self,
        object: &MetastoreObject,
        destination: &str,
    ) -> Result<bool, Error> {
        info!("migrating {} to {destination} with a deep copy", object.key());
        let statement = object.sql_deep_clone(destination)?;
        debug!(statement = %statement, "deep copy");
        self.backend.execute(&statement).await?;
        self.record_provenance(object, destination, true).await
    }

    async fn migrate_metadata_sync(
        &self,
        object: &MetastoreObject,
        destination: &str,
    ) -> Result<bool, Error> {
        info!("registering {} as {destination} without copying data", object.key());
        let rows = self.backend.fetch(&object.sql_metadata_sync(destination)).await?;
        let outcome = SyncOutcome::from_rows(&rows)?;
        if !outcome.is_success() {
            warn!(
                object = %object.key(),
                destination = %destination,
                status = %outcome.status_code,
                description = %outcome.description,
                "metadata sync failed"
            );
            return Ok(false);
        }
        // the sync primitive tags the destination itself
        self.record_provenance(object, destination, false).await
    }

    async fn migrate_view(
        &self,
        object: &MetastoreObject,
        destination: &str,
    ) -> Result<bool, Error> {
        info!("migrating view {} to {destination}", object.key());
        let statement = object.sql_redefine_view(destination)?;
        self.backend.execute(&statement).await?;
        self.record_provenance(object, destination, true).await
    }

    /// Records migration provenance once the destination exists.
    ///
    /// A failure here is the copied-but-untagged window: the task
    /// fails and a re-run repairs it, since the creating statements
    /// are idempotent at the remote layer.
    async fn record_provenance(
        &self,
        object: &MetastoreObject,
        destination: &str,
        tag_destination: bool,
    ) -> Result<bool, Error> {
        match self.apply_tags(object, destination, tag_destination).await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(
                    object = %object.key(),
                    destination = %destination,
                    error = %e,
                    "object migrated but provenance tagging failed, re-run to repair"
                );
                Ok(false)
            }
        }
    }

    async fn apply_tags(
        &self,
        object: &MetastoreObject,
        destination: &str,
        tag_destination: bool,
    ) -> Result<(), Error> {
        if tag_destination {
            self.backend.execute(&object.sql_set_upgraded_from(destination)).await?;
        }
        let workspace_id = self.catalog.workspace_id().await?;
        self.backend
            .execute(&object.sql_set_upgraded_to(destination, workspace_id))
            .await?;
        Ok(())
    }

    /// Reverts previously migrated objects, optionally narrowed to one
    /// schema or one object within it.
    ///
    /// Every candidate has its source-side migrated-to tag cleared;
    /// the destination copy is dropped only for views, external
    /// objects, or when `delete_managed` is set.
    pub async fn revert(
        &self,
        schema: Option<&str>,
        object: Option<&str>,
        delete_managed: bool,
    ) -> Result<(), Error> {
        let seen = self.refresher.seen_objects().await?;
        let reverse = invert_index(&seen);
        let candidates = self.revert_candidates(schema, object, &reverse).await?;
        if candidates.is_empty() {
            info!("nothing to revert");
            return Ok(());
        }
        let mut tasks = Vec::new();
        for candidate in &candidates {
            // selection guarantees the inverse entry exists
            let Some(destination) = reverse.get(&candidate.key()) else {
                continue;
            };
            tasks.push(self.revert_one(candidate, destination, delete_managed));
        }
        info!(total = tasks.len(), "starting revert tasks");
        tasks::run_all("revert", self.config.max_tasks, tasks).await?;
        Ok(())
    }

    /// Source objects provably migrated, i.e. present in the inverse
    /// of the seen-objects index.
    async fn revert_candidates(
        &self,
        schema: Option<&str>,
        object: Option<&str>,
        reverse: &SeenObjects,
    ) -> Result<Vec<MetastoreObject>, Error> {
        let schema = schema.map(str::to_lowercase);
        let mut object = object.map(str::to_lowercase);
        if object.is_some() && schema.is_none() {
            error!("cannot filter by object name without a schema filter, ignoring the object filter");
            object = None;
        }
        let mut candidates = Vec::new();
        for item in self.inventory.snapshot().await? {
            if let Some(schema) = &schema {
                if item.database.to_lowercase() != *schema {
                    continue;
                }
            }
            if let Some(object) = &object {
                if item.name.to_lowercase() != *object {
                    continue;
                }
            }
            if !reverse.contains_key(&item.key()) {
                continue;
            }
            candidates.push(item);
        }
        Ok(candidates)
    }

    async fn revert_one(
        &self,
        object: &MetastoreObject,
        destination: &str,
        delete_managed: bool,
    ) -> Result<bool, Error> {
        info!("reverting {} migrated to {destination}", object.key());
        self.backend.execute(&object.sql_clear_upgraded_to()).await?;
        let drop_destination = object.kind() == ObjectKind::View
            || object.object_type == ObjectType::External
            || delete_managed;
        if drop_destination {
            self.backend.execute(&object.sql_drop_destination(destination)).await?;
        } else {
            info!(
                object = %object.key(),
                destination = %destination,
                "managed object detached, destination copy left in place"
            );
        }
        Ok(true)
    }

    /// Per-schema counts of provably migrated objects with a confirmed
    /// migrated-to tag, broken down by strategy.
    pub async fn migration_counts(&self) -> Result<Vec<MigrationCount>, Error> {
        let seen = self.refresher.seen_objects().await?;
        let reverse = invert_index(&seen);
        let candidates = self.revert_candidates(None, None, &reverse).await?;
        let mut by_database: HashMap<String, HashMap<MigrationStrategy, usize>> = HashMap::new();
        for object in &candidates {
            if object.upgraded_to.is_none() {
                continue;
            }
            *by_database
                .entry(object.database.clone())
                .or_default()
                .entry(object.strategy)
                .or_insert(0) += 1;
        }
        let mut counts: Vec<MigrationCount> = by_database
            .into_iter()
            .map(|(database, by_strategy)| MigrationCount { database, by_strategy })
            .collect();
        counts.sort_by(|a, b| a.database.cmp(&b.database));
        Ok(counts)
    }

    /// Prints what a revert would touch. Returns false when nothing
    /// has been migrated.
    pub async fn revert_report(&self, delete_managed: bool) -> Result<bool, Error> {
        let counts = self.migration_counts().await?;
        if counts.is_empty() {
            info!("no migrated objects were found");
            return Ok(false);
        }
        println!("{}", render_report(&counts, delete_managed));
        Ok(true)
    }

    /// Live point check of one source object's migrated-to tag.
    ///
    /// Independent of the bulk index; safe to call without a prior
    /// migrate or revert.
    pub async fn is_upgraded(&self, schema: &str, object: &str) -> Result<bool, Error> {
        self.refresher.is_upgraded(schema, object).await
    }
}

/// Renders the revert report table and the effective deletion policy.
fn render_report(counts: &[MigrationCount], delete_managed: bool) -> String {
    let mut header = format!("{:<20}", "schema");
    for strategy in MigrationStrategy::ALL {
        let _ = write!(header, " | {:>12}", strategy.label());
    }
    let separator = "=".repeat(header.len());
    let mut out = String::new();
    let _ = writeln!(out, "migrated object counts per schema:");
    let _ = writeln!(out, "{header}");
    let _ = writeln!(out, "{separator}");
    for count in counts {
        let _ = write!(out, "{:<20}", count.database);
        for strategy in MigrationStrategy::ALL {
            let _ = write!(out, " | {:>12}", count.get(strategy));
        }
        let _ = writeln!(out);
    }
    let _ = writeln!(out, "{separator}");
    let _ = writeln!(out, "external objects and views are dropped on revert");
    if delete_managed {
        let _ = writeln!(out, "deep-copied objects will be deleted");
    } else {
        let _ = writeln!(out, "deep-copied objects will be left intact");
    }
    out
}
