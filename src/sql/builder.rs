//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from a resolved resource.
//! Every selected column is aliased to its wire field name so rows decode straight into records.

use crate::config::{ColumnType, ResolvedResource};
use crate::sql::params::PgBindValue;

/// Row cap applied to list queries.
pub const MAX_LIMIT: u32 = 1000;

/// Quote identifier for PostgreSQL (safe: only from config).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf::default()
    }

    /// Push a param and return its placeholder, cast when the column needs it.
    fn push_param(&mut self, v: PgBindValue, ty: ColumnType) -> String {
        self.params.push(v);
        let n = self.params.len();
        match ty.param_cast() {
            Some(cast) => format!("${}::{}", n, cast),
            None => format!("${}", n),
        }
    }
}

/// `col AS "field"`; float columns are cast so NUMERIC and REAL tables decode as f64.
fn select_expr(column: &str, field: &str, ty: ColumnType) -> String {
    match ty {
        ColumnType::Float => format!("{}::float8 AS {}", quoted(column), quoted(field)),
        _ => format!("{} AS {}", quoted(column), quoted(field)),
    }
}

/// Primary key first, then readable columns in catalog order. Write-only columns never leave the database.
fn select_column_list(resource: &ResolvedResource) -> String {
    std::iter::once(select_expr(
        &resource.pk_column,
        &resource.pk_field,
        ColumnType::Integer,
    ))
    .chain(
        resource
            .readable_columns()
            .map(|c| select_expr(&c.column, &c.field, c.type_)),
    )
    .collect::<Vec<_>>()
    .join(", ")
}

fn column_type(resource: &ResolvedResource, field: &str) -> Option<ColumnType> {
    if field == resource.pk_field {
        return Some(ColumnType::Integer);
    }
    resource.column(field).map(|c| c.type_)
}

/// SELECT by primary key. Caller binds the id as $1.
pub fn select_by_id(resource: &ResolvedResource) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = $1",
        select_column_list(resource),
        quoted(&resource.table),
        quoted(&resource.pk_column)
    );
    q
}

/// SELECT list with exact-match filters on known fields, the catalog ordering and optional LIMIT/OFFSET.
/// The primary key breaks ordering ties. Unknown filter fields are skipped.
pub fn select_list(
    resource: &ResolvedResource,
    filters: &[(String, PgBindValue)],
    limit: Option<u32>,
    offset: Option<u32>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    for (field, val) in filters {
        let (Some(col), Some(ty)) = (resource.column_name(field), column_type(resource, field)) else {
            continue;
        };
        let ph = q.push_param(val.clone(), ty);
        where_parts.push(format!("{} = {}", quoted(col), ph));
    }

    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    let order_col = resource
        .column_name(&resource.order_by)
        .unwrap_or(&resource.pk_column);
    let direction = if resource.order_desc { " DESC" } else { "" };
    let mut order_clause = format!(" ORDER BY {}{}", quoted(order_col), direction);
    if order_col != resource.pk_column {
        order_clause.push_str(&format!(", {}", quoted(&resource.pk_column)));
    }
    let limit_clause = limit
        .map(|n| format!(" LIMIT {}", n.min(MAX_LIMIT)))
        .unwrap_or_default();
    let offset_clause = offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{}{}{}{}",
        select_column_list(resource),
        quoted(&resource.table),
        where_clause,
        order_clause,
        limit_clause,
        offset_clause
    );
    q
}

/// INSERT the given field values and return the stored row. Columns left out fall back to their
/// database default; with no values at all the row is all defaults.
pub fn insert(resource: &ResolvedResource, values: &[(String, PgBindValue)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for (field, val) in values {
        let Some(c) = resource.column(field) else { continue };
        placeholders.push(q.push_param(val.clone(), c.type_));
        cols.push(quoted(&c.column));
    }
    let table = quoted(&resource.table);
    let returning = select_column_list(resource);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id, setting exactly the given fields. Returns `None` when there is nothing to set.
pub fn update(resource: &ResolvedResource, id: i64, values: &[(String, PgBindValue)]) -> Option<QueryBuf> {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (field, val) in values {
        let Some(c) = resource.column(field) else { continue };
        let ph = q.push_param(val.clone(), c.type_);
        sets.push(format!("{} = {}", quoted(&c.column), ph));
    }
    if sets.is_empty() {
        return None;
    }
    let id_ph = q.push_param(PgBindValue::I64(id), ColumnType::Integer);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        quoted(&resource.table),
        sets.join(", "),
        quoted(&resource.pk_column),
        id_ph
    );
    Some(q)
}

/// DELETE by id. Caller binds the id as $1.
pub fn delete(resource: &ResolvedResource) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "DELETE FROM {} WHERE {} = $1",
        quoted(&resource.table),
        quoted(&resource.pk_column)
    );
    q
}
