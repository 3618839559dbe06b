//! Load the catalog from the embedded JSON or from a file, and resolve it.

use crate::config::resolved::{ColumnInfo, Operation, ResolvedModel, ResolvedResource};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Catalog shipped with the binary.
pub const EMBEDDED_CATALOG: &str = include_str!("../../config/resources.json");

pub fn parse_catalog(json: &str) -> Result<Catalog, ConfigError> {
    let resources: Vec<ResourceConfig> =
        serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))?;
    Ok(Catalog { resources })
}

pub fn embedded_catalog() -> Result<Catalog, ConfigError> {
    parse_catalog(EMBEDDED_CATALOG)
}

pub async fn load_from_path(path: &Path) -> Result<Catalog, ConfigError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_catalog(&json)
}

/// Build resolved model from catalog (validates first).
pub fn resolve(catalog: &Catalog) -> Result<ResolvedModel, ConfigError> {
    validate(catalog)?;

    let mut resources = Vec::with_capacity(catalog.resources.len());
    let mut resource_by_id = HashMap::new();

    for r in &catalog.resources {
        let columns = r
            .columns
            .iter()
            .map(|c| ColumnInfo {
                field: c.field.clone(),
                column: c.column.clone(),
                type_: c.type_,
                read_only: c.read_only,
                write_only: c.write_only,
                default_now: c.default_now,
                references: c.references.clone(),
            })
            .collect();
        let operations = r
            .operations
            .iter()
            .filter_map(|op| Operation::parse(op))
            .collect();
        let resource = Arc::new(ResolvedResource {
            id: r.id.clone(),
            label: r.label.clone(),
            table: r.table.clone(),
            collection_path: r.collection_path.clone(),
            item_path: r.item_path.clone(),
            pk_field: r.primary_key.field.clone(),
            pk_column: r.primary_key.column.clone(),
            columns,
            order_by: r.order_by.clone(),
            order_desc: r.order_desc,
            operations,
        });
        resource_by_id.insert(r.id.clone(), resource.clone());
        resources.push(resource);
    }

    Ok(ResolvedModel {
        resources,
        resource_by_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_catalog_resolves() {
        let model = resolve(&embedded_catalog().unwrap()).unwrap();
        assert_eq!(model.resources.len(), 38);

        let users = model.resource("user").unwrap();
        assert_eq!(users.table, "User");
        assert!(users.allows(Operation::Read));
        assert!(users.column("password").unwrap().write_only);
        assert_eq!(users.item_route().as_deref(), Some("/api/user"));

        let audit = model.resource("audit_log").unwrap();
        assert!(audit.item_path.is_none());
        assert!(!audit.allows(Operation::Delete));
    }

    #[test]
    fn product_type_has_numeric_price() {
        let model = resolve(&embedded_catalog().unwrap()).unwrap();
        let pt = model.resource("product_type").unwrap();
        assert_eq!(pt.column("unit_price").unwrap().type_, ColumnType::Float);
        assert_eq!(pt.column("description").unwrap().type_, ColumnType::Text);
        assert_eq!(pt.column("product_name").unwrap().column, "name");
        assert_eq!(pt.column("category").unwrap().column, "grade");
        assert!(pt.column("name").is_none());
    }

    #[test]
    fn tree_species_uses_item_suffix() {
        let model = resolve(&embedded_catalog().unwrap()).unwrap();
        let ts = model.resource("tree_species").unwrap();
        assert_eq!(ts.collection_route(), "/api/treespecies");
        assert_eq!(ts.item_route().as_deref(), Some("/api/treespecies-item"));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(parse_catalog("{not json"), Err(ConfigError::Load(_))));
    }

    #[test]
    fn column_name_covers_primary_key() {
        let model = resolve(&embedded_catalog().unwrap()).unwrap();
        let forest = model.resource("forest").unwrap();
        assert_eq!(forest.column_name("forest_id"), Some("forestid"));
        assert_eq!(forest.column_name("forest_name"), Some("forestname"));
        assert_eq!(forest.column_name("nope"), None);
    }
}
