//! Raw catalog types matching `config/resources.json`.

use serde::Deserialize;

/// Scalar column types the catalog can declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Boolean,
    /// Calendar date, exchanged as `YYYY-MM-DD` strings.
    Date,
    /// Timestamp without time zone, exchanged as strings.
    Timestamp,
}

impl ColumnType {
    /// PostgreSQL type used in DDL.
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Float => "DOUBLE PRECISION",
            ColumnType::Text => "TEXT",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Date => "DATE",
            ColumnType::Timestamp => "TIMESTAMP",
        }
    }

    /// Cast applied to bind parameters. Text-typed binds need it for date and timestamp columns.
    pub fn param_cast(self) -> Option<&'static str> {
        match self {
            ColumnType::Date => Some("date"),
            ColumnType::Timestamp => Some("timestamp"),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PrimaryKeyConfig {
    pub field: String,
    pub column: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ColumnConfig {
    /// JSON field name on the wire.
    pub field: String,
    /// Database column name.
    pub column: String,
    #[serde(rename = "type")]
    pub type_: ColumnType,
    /// Filled by the database; ignored on input.
    #[serde(default)]
    pub read_only: bool,
    /// Accepted on input, never returned.
    #[serde(default)]
    pub write_only: bool,
    /// Defaults to NOW() when not supplied.
    #[serde(default)]
    pub default_now: bool,
    /// Resource id this column points at.
    #[serde(default)]
    pub references: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ResourceConfig {
    pub id: String,
    pub label: String,
    pub table: String,
    pub collection_path: String,
    #[serde(default)]
    pub item_path: Option<String>,
    pub primary_key: PrimaryKeyConfig,
    pub columns: Vec<ColumnConfig>,
    pub order_by: String,
    #[serde(default)]
    pub order_desc: bool,
    pub operations: Vec<String>,
}

/// The whole catalog.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub resources: Vec<ResourceConfig>,
}
