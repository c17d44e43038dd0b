//! Destination catalog service client.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::CatalogError;

/// A catalog visible in the destination service.
#[derive(Debug, Clone)]
pub struct CatalogInfo {
    pub name: String,
}

/// A schema within a destination catalog.
#[derive(Debug, Clone)]
pub struct SchemaInfo {
    pub catalog: String,
    pub name: String,
}

/// An object listed in a destination schema, with its property tags.
#[derive(Debug, Clone, Default)]
pub struct ObjectInfo {
    pub name: String,
    /// Fully qualified `catalog.schema.name`, when the service
    /// resolves one.
    pub full_name: Option<String>,
    pub properties: HashMap<String, String>,
}

/// Read-only client for the destination catalog service.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Catalogs reachable from this workspace.
    async fn list_catalogs(&self) -> Result<Vec<CatalogInfo>, CatalogError>;

    /// Schemas within one catalog.
    async fn list_schemas(&self, catalog: &str) -> Result<Vec<SchemaInfo>, CatalogError>;

    /// Objects within one schema, including property metadata.
    async fn list_objects(&self, catalog: &str, schema: &str)
        -> Result<Vec<ObjectInfo>, CatalogError>;

    /// Identity of the workspace this client executes in.
    async fn workspace_id(&self) -> Result<u64, CatalogError>;
}
