//! Destination rule mapping.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::inventory::MetastoreObject;

/// Maps one source object to its destination identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Destination catalog.
    pub catalog: String,
    /// Source schema the rule applies to.
    pub src_schema: String,
    /// Destination schema.
    pub dst_schema: String,
    /// Source object name.
    pub src_table: String,
    /// Destination object name.
    pub dst_table: String,
}

impl Rule {
    /// Lower-cased destination `catalog.schema.table` triple.
    pub fn destination_key(&self) -> String {
        format!("{}.{}.{}", self.catalog, self.dst_schema, self.dst_table).to_lowercase()
    }
}

/// A source object paired with the rule that places it.
#[derive(Debug, Clone)]
pub struct ObjectToMigrate {
    pub object: MetastoreObject,
    pub rule: Rule,
}

/// Computes destination rules for a source inventory.
#[async_trait]
pub trait ObjectMapping: Send + Sync {
    /// Returns the (source, rule) pairs to consider this run.
    ///
    /// At most one rule per source identity.
    async fn get_rules(&self, inventory: &[MetastoreObject]) -> Result<Vec<ObjectToMigrate>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_key_is_lower_cased() {
        let rule = Rule {
            catalog: "Main".to_string(),
            src_schema: "sales".to_string(),
            dst_schema: "Sales".to_string(),
            src_table: "orders".to_string(),
            dst_table: "Orders".to_string(),
        };
        assert_eq!(rule.destination_key(), "main.sales.orders");
    }
}
