//! Catalog validation: referential integrity and route consistency.

use crate::config::{Catalog, Operation};
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(catalog: &Catalog) -> Result<(), ConfigError> {
    let resource_ids: HashSet<&str> = catalog.resources.iter().map(|r| r.id.as_str()).collect();
    if resource_ids.len() != catalog.resources.len() {
        let mut seen = HashSet::new();
        for r in &catalog.resources {
            if !seen.insert(r.id.as_str()) {
                return Err(ConfigError::DuplicateResource(r.id.clone()));
            }
        }
    }

    let mut paths = HashSet::new();
    for r in &catalog.resources {
        for path in std::iter::once(&r.collection_path).chain(r.item_path.iter()) {
            if path.is_empty() || path.contains('/') {
                return Err(ConfigError::Validation(format!(
                    "{}: invalid path segment '{}'",
                    r.id, path
                )));
            }
            if !paths.insert(path.as_str()) {
                return Err(ConfigError::DuplicatePathSegment(path.clone()));
            }
        }

        if r.columns.is_empty() {
            return Err(ConfigError::Validation(format!("{}: no columns", r.id)));
        }

        let mut fields = HashSet::new();
        fields.insert(r.primary_key.field.as_str());
        for c in &r.columns {
            if !fields.insert(c.field.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "{}: duplicate field '{}'",
                    r.id, c.field
                )));
            }
            if c.read_only && c.write_only {
                return Err(ConfigError::Validation(format!(
                    "{}: field '{}' cannot be both read_only and write_only",
                    r.id, c.field
                )));
            }
            if let Some(target) = &c.references {
                if !resource_ids.contains(target.as_str()) {
                    return Err(ConfigError::MissingReference {
                        kind: "resource",
                        id: target.clone(),
                    });
                }
            }
        }

        if !fields.contains(r.order_by.as_str()) {
            return Err(ConfigError::Validation(format!(
                "{}: order_by '{}' is not a field",
                r.id, r.order_by
            )));
        }

        for op in &r.operations {
            let parsed = Operation::parse(op)
                .ok_or_else(|| ConfigError::Validation(format!("{}: unknown operation '{}'", r.id, op)))?;
            if parsed.is_item() && r.item_path.is_none() {
                return Err(ConfigError::Validation(format!(
                    "{}: operation '{}' needs an item_path",
                    r.id, op
                )));
            }
        }
    }

    Ok(())
}
