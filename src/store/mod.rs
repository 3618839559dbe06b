//! Persistence behind the HTTP handlers. Handlers only see `dyn Store`.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

use crate::config::ResolvedResource;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// One row keyed by wire field names.
pub type Record = serde_json::Map<String, Value>;

/// Field values in catalog column order, already checked against the column types.
pub type FieldValues = Vec<(String, Value)>;

/// Format used for timestamps read back from any store.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Read a date or timestamp string in the shapes PostgreSQL's `::date` and `::timestamp`
/// casts are fed: `YYYY-MM-DD`, ISO 8601 with `T` or a space, optionally with an offset.
/// A bare date is midnight; an offset is dropped, not applied.
pub fn parse_temporal(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    [TIMESTAMP_FORMAT, "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|t| t.naive_local()))
}

#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    /// Exact-match filters by field name.
    pub filters: FieldValues,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Rows in the resource's catalog order.
    async fn list(&self, resource: &ResolvedResource, query: &ListQuery) -> Result<Vec<Record>, AppError>;

    async fn read(&self, resource: &ResolvedResource, id: i64) -> Result<Option<Record>, AppError>;

    /// Insert and return the stored row including generated key and defaults.
    async fn insert(&self, resource: &ResolvedResource, values: &FieldValues) -> Result<Record, AppError>;

    /// Overwrite the given fields; returns the number of rows touched.
    async fn update(&self, resource: &ResolvedResource, id: i64, values: &FieldValues) -> Result<u64, AppError>;

    /// Returns the number of rows removed.
    async fn delete(&self, resource: &ResolvedResource, id: i64) -> Result<u64, AppError>;

    /// Cheap liveness check used by `/ready`.
    async fn ping(&self) -> Result<(), AppError>;
}
