//! Source metastore inventory model.
//!
//! [`MetastoreObject`] describes one table or view in the legacy
//! metastore, as reported by the external inventory crawler. The core
//! never mutates these records; it reads them and renders the
//! migration statements they imply.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Property key on a destination object naming its migration source.
pub const PROP_UPGRADED_FROM: &str = "upgraded_from";

/// Property key on a source object naming its migration destination.
pub const PROP_UPGRADED_TO: &str = "upgraded_to";

/// Property key on a source object recording which workspace performed
/// the migration. Disambiguates when several workspaces share one
/// metastore.
pub const PROP_WORKSPACE_ID: &str = "upgraded_to_workspace_id";

/// Migration strategy assigned to a source object by the inventory
/// crawler. Consumed as given; the core never re-derives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStrategy {
    /// Managed table whose data lives in platform-owned root storage;
    /// migrated by deep-copying the data to the destination.
    DeepCopy,
    /// External table registered in place through the metadata-only
    /// sync primitive, no data movement.
    MetadataSync,
    /// View recreated at the destination by redefining its SQL text.
    ViewRedefine,
    /// No strategy defined; skipped, not an error.
    Unsupported,
}

impl MigrationStrategy {
    /// All strategies, in reporting column order.
    pub const ALL: [MigrationStrategy; 4] = [
        MigrationStrategy::DeepCopy,
        MigrationStrategy::MetadataSync,
        MigrationStrategy::ViewRedefine,
        MigrationStrategy::Unsupported,
    ];

    /// Report column label.
    pub fn label(self) -> &'static str {
        match self {
            MigrationStrategy::DeepCopy => "deep copy",
            MigrationStrategy::MetadataSync => "sync",
            MigrationStrategy::ViewRedefine => "view",
            MigrationStrategy::Unsupported => "unsupported",
        }
    }
}

/// Storage ownership reported by the metastore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectType {
    Managed,
    External,
    View,
}

/// Statement keyword class of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    View,
}

impl ObjectKind {
    /// Keyword used in ALTER and DROP statements.
    pub fn sql_keyword(self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
        }
    }
}

/// A table or view in the legacy metastore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetastoreObject {
    /// Legacy catalog holding the object.
    pub catalog: String,
    /// Schema (database) within the legacy catalog.
    pub database: String,
    /// Object name.
    pub name: String,
    /// Storage ownership.
    pub object_type: ObjectType,
    /// Storage format, e.g. `DELTA` or `PARQUET`.
    pub table_format: String,
    /// Storage location backing the object, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// View definition text; present iff the object is a view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_text: Option<String>,
    /// Strategy assigned by the crawler.
    pub strategy: MigrationStrategy,
    /// Destination key recorded by a prior migration, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgraded_to: Option<String>,
}

impl MetastoreObject {
    /// Lower-cased `catalog.database.name` identity.
    pub fn key(&self) -> String {
        format!("{}.{}.{}", self.catalog, self.database, self.name).to_lowercase()
    }

    /// Tables and views take different ALTER/DROP keywords.
    pub fn kind(&self) -> ObjectKind {
        if self.view_text.is_some() {
            ObjectKind::View
        } else {
            ObjectKind::Table
        }
    }

    /// Statement creating `target` as a deep copy of this table.
    ///
    /// Only Delta sources can be deep-cloned.
    pub fn sql_deep_clone(&self, target: &str) -> Result<String, Error> {
        if !self.table_format.eq_ignore_ascii_case("delta") {
            return Err(Error::UnsupportedFormat {
                object: self.key(),
                format: self.table_format.clone(),
            });
        }
        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {target} DEEP CLONE {};",
            self.key()
        ))
    }

    /// Statement registering `target` over this object's existing
    /// storage without copying data.
    pub fn sql_metadata_sync(&self, target: &str) -> String {
        format!("SYNC TABLE {target} FROM {};", self.key())
    }

    /// Statement recreating this view as `target`.
    pub fn sql_redefine_view(&self, target: &str) -> Result<String, Error> {
        let Some(text) = self.view_text.as_deref() else {
            return Err(Error::ViewDefinitionMissing { object: self.key() });
        };
        Ok(format!("CREATE VIEW IF NOT EXISTS {target} AS {text};"))
    }

    /// Statement tagging `target` with the source it was migrated
    /// from.
    pub fn sql_set_upgraded_from(&self, target: &str) -> String {
        format!(
            "ALTER {} {target} SET TBLPROPERTIES ('{PROP_UPGRADED_FROM}' = '{}');",
            self.kind().sql_keyword(),
            self.key()
        )
    }

    /// Statement tagging this object with the destination it was
    /// migrated to, recording the performing workspace.
    pub fn sql_set_upgraded_to(&self, target: &str, workspace_id: u64) -> String {
        format!(
            "ALTER {} {} SET TBLPROPERTIES ('{PROP_UPGRADED_TO}' = '{target}', '{PROP_WORKSPACE_ID}' = '{workspace_id}');",
            self.kind().sql_keyword(),
            self.key()
        )
    }

    /// Statement clearing this object's migrated-to tag.
    pub fn sql_clear_upgraded_to(&self) -> String {
        format!(
            "ALTER {} {} UNSET TBLPROPERTIES IF EXISTS ('{PROP_UPGRADED_TO}');",
            self.kind().sql_keyword(),
            self.key()
        )
    }

    /// Statement dropping the destination copy if it still exists.
    pub fn sql_drop_destination(&self, target: &str) -> String {
        format!("DROP {} IF EXISTS {target}", self.kind().sql_keyword())
    }
}

/// Enumerates the source metastore.
#[async_trait]
pub trait ObjectInventory: Send + Sync {
    /// Returns the full current inventory of source objects.
    async fn snapshot(&self) -> Result<Vec<MetastoreObject>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn managed_table() -> MetastoreObject {
        MetastoreObject {
            catalog: "Metastore".to_string(),
            database: "Sales".to_string(),
            name: "Orders".to_string(),
            object_type: ObjectType::Managed,
            table_format: "DELTA".to_string(),
            location: Some("dbfs:/root/sales/orders".to_string()),
            view_text: None,
            strategy: MigrationStrategy::DeepCopy,
            upgraded_to: None,
        }
    }

    fn view() -> MetastoreObject {
        MetastoreObject {
            catalog: "metastore".to_string(),
            database: "sales".to_string(),
            name: "recent".to_string(),
            object_type: ObjectType::View,
            table_format: "VIEW".to_string(),
            location: None,
            view_text: Some("SELECT * FROM orders WHERE ts > now() - 7".to_string()),
            strategy: MigrationStrategy::ViewRedefine,
            upgraded_to: None,
        }
    }

    #[test]
    fn test_key_is_lower_cased_triple() {
        assert_eq!(managed_table().key(), "metastore.sales.orders");
    }

    #[test]
    fn test_kind_follows_view_text() {
        assert_eq!(managed_table().kind(), ObjectKind::Table);
        assert_eq!(view().kind(), ObjectKind::View);
    }

    #[test]
    fn test_deep_clone_statement() {
        let sql = managed_table().sql_deep_clone("main.sales.orders").unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS main.sales.orders DEEP CLONE metastore.sales.orders;"
        );
    }

    #[test]
    fn test_deep_clone_rejects_non_delta() {
        let mut object = managed_table();
        object.table_format = "PARQUET".to_string();
        let err = object.sql_deep_clone("main.sales.orders").unwrap_err();
        assert_eq!(
            err.to_string(),
            "metastore.sales.orders is not a delta table: PARQUET"
        );
    }

    #[test]
    fn test_metadata_sync_statement() {
        let mut object = managed_table();
        object.object_type = ObjectType::External;
        object.strategy = MigrationStrategy::MetadataSync;
        assert_eq!(
            object.sql_metadata_sync("main.sales.orders"),
            "SYNC TABLE main.sales.orders FROM metastore.sales.orders;"
        );
    }

    #[test]
    fn test_view_statement() {
        let sql = view().sql_redefine_view("main.sales.recent").unwrap();
        assert_eq!(
            sql,
            "CREATE VIEW IF NOT EXISTS main.sales.recent AS SELECT * FROM orders WHERE ts > now() - 7;"
        );
    }

    #[test]
    fn test_view_statement_requires_text() {
        let err = managed_table().sql_redefine_view("main.sales.orders").unwrap_err();
        assert!(matches!(err, Error::ViewDefinitionMissing { .. }));
    }

    #[test]
    fn test_tag_statements() {
        let object = managed_table();
        assert_eq!(
            object.sql_set_upgraded_from("main.sales.orders"),
            "ALTER TABLE main.sales.orders SET TBLPROPERTIES ('upgraded_from' = 'metastore.sales.orders');"
        );
        assert_eq!(
            object.sql_set_upgraded_to("main.sales.orders", 123),
            "ALTER TABLE metastore.sales.orders SET TBLPROPERTIES ('upgraded_to' = 'main.sales.orders', 'upgraded_to_workspace_id' = '123');"
        );
        assert_eq!(
            object.sql_clear_upgraded_to(),
            "ALTER TABLE metastore.sales.orders UNSET TBLPROPERTIES IF EXISTS ('upgraded_to');"
        );
    }

    #[test]
    fn test_view_tag_statements_use_view_keyword() {
        let object = view();
        assert!(object
            .sql_set_upgraded_from("main.sales.recent")
            .starts_with("ALTER VIEW main.sales.recent "));
        assert_eq!(
            object.sql_drop_destination("main.sales.recent"),
            "DROP VIEW IF EXISTS main.sales.recent"
        );
    }

    #[test]
    fn test_strategy_order_and_labels() {
        let labels: Vec<&str> = MigrationStrategy::ALL.iter().map(|s| s.label()).collect();
        assert_eq!(labels, vec!["deep copy", "sync", "view", "unsupported"]);
    }
}
