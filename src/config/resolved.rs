//! Resolved resource model: catalog validated and flattened for runtime use.

use crate::config::ColumnType;
use std::collections::HashMap;
use std::sync::Arc;

/// CRUD operations a resource can expose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "list" => Some(Operation::List),
            "create" => Some(Operation::Create),
            "read" => Some(Operation::Read),
            "update" => Some(Operation::Update),
            "delete" => Some(Operation::Delete),
            _ => None,
        }
    }

    /// Whether the operation is served on the singular `?id=` path.
    pub fn is_item(self) -> bool {
        matches!(self, Operation::Read | Operation::Update | Operation::Delete)
    }
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub field: String,
    pub column: String,
    pub type_: ColumnType,
    pub read_only: bool,
    pub write_only: bool,
    pub default_now: bool,
    pub references: Option<String>,
}

impl ColumnInfo {
    pub fn writable(&self) -> bool {
        !self.read_only
    }

    pub fn readable(&self) -> bool {
        !self.write_only
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedResource {
    pub id: String,
    pub label: String,
    pub table: String,
    pub collection_path: String,
    pub item_path: Option<String>,
    pub pk_field: String,
    pub pk_column: String,
    /// Non-key columns in catalog order.
    pub columns: Vec<ColumnInfo>,
    /// Field the list is ordered by; may be the primary key.
    pub order_by: String,
    pub order_desc: bool,
    pub operations: Vec<Operation>,
}

impl ResolvedResource {
    pub fn allows(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    pub fn column(&self, field: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.field == field)
    }

    /// Database column for a field name, including the primary key.
    pub fn column_name(&self, field: &str) -> Option<&str> {
        if field == self.pk_field {
            return Some(&self.pk_column);
        }
        self.column(field).map(|c| c.column.as_str())
    }

    pub fn writable_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter().filter(|c| c.writable())
    }

    pub fn readable_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter().filter(|c| c.readable())
    }

    pub fn collection_route(&self) -> String {
        format!("/api/{}", self.collection_path)
    }

    pub fn item_route(&self) -> Option<String> {
        self.item_path.as_ref().map(|p| format!("/api/{}", p))
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub resources: Vec<Arc<ResolvedResource>>,
    pub resource_by_id: HashMap<String, Arc<ResolvedResource>>,
}

impl ResolvedModel {
    pub fn resource(&self, id: &str) -> Option<&Arc<ResolvedResource>> {
        self.resource_by_id.get(id)
    }
}
