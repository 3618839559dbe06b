//! In-process store. Keeps the same ordering, default and write-only rules as PostgreSQL,
//! which makes it the backing for the HTTP tests and for `LUMBER_STORE=memory`.

use super::{parse_temporal, FieldValues, ListQuery, Record, Store, TIMESTAMP_FORMAT};
use crate::config::{ColumnType, ResolvedResource};
use crate::error::AppError;
use crate::sql::MAX_LIMIT;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

#[derive(Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, Record>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

fn now() -> Value {
    Value::String(chrono::Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string())
}

/// Numbers compare numerically, strings lexically. Nulls sort after everything, as in PostgreSQL.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a.unwrap_or(&Value::Null), b.unwrap_or(&Value::Null)) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Filter equality. Dates and timestamps compare as values, the way the casts in the
/// generated SQL make PostgreSQL compare them.
fn value_eq(ty: Option<ColumnType>, a: Option<&Value>, b: &Value) -> bool {
    match (ty, a.unwrap_or(&Value::Null), b) {
        (_, Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Some(ColumnType::Date), Value::String(x), Value::String(y)) => {
            match (parse_temporal(x), parse_temporal(y)) {
                (Some(x), Some(y)) => x.date() == y.date(),
                _ => false,
            }
        }
        (Some(ColumnType::Timestamp), Value::String(x), Value::String(y)) => {
            match (parse_temporal(x), parse_temporal(y)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (_, x, y) => x == y,
    }
}

/// Copy of a stored row with write-only fields removed.
fn visible(resource: &ResolvedResource, row: &Record) -> Record {
    let mut out = row.clone();
    for c in resource.columns.iter().filter(|c| c.write_only) {
        out.remove(&c.field);
    }
    out
}

#[async_trait]
impl Store for MemoryStore {
    async fn list(&self, resource: &ResolvedResource, query: &ListQuery) -> Result<Vec<Record>, AppError> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let Some(table) = tables.get(&resource.id) else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<&Record> = table
            .rows
            .values()
            .filter(|row| {
                query
                    .filters
                    .iter()
                    .all(|(field, v)| value_eq(resource.column(field).map(|c| c.type_), row.get(field), v))
            })
            .collect();
        rows.sort_by(|a, b| {
            let mut ord = compare_values(a.get(&resource.order_by), b.get(&resource.order_by));
            if resource.order_desc {
                ord = ord.reverse();
            }
            ord.then_with(|| compare_values(a.get(&resource.pk_field), b.get(&resource.pk_field)))
        });
        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map_or(usize::MAX, |n| n.min(MAX_LIMIT) as usize);
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| visible(resource, row))
            .collect())
    }

    async fn read(&self, resource: &ResolvedResource, id: i64) -> Result<Option<Record>, AppError> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tables
            .get(&resource.id)
            .and_then(|t| t.rows.get(&id))
            .map(|row| visible(resource, row)))
    }

    async fn insert(&self, resource: &ResolvedResource, values: &FieldValues) -> Result<Record, AppError> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let table = tables.entry(resource.id.clone()).or_default();
        table.last_id += 1;
        let id = table.last_id;

        let mut row = Record::new();
        row.insert(resource.pk_field.clone(), Value::from(id));
        for c in &resource.columns {
            let supplied = values.iter().find(|(f, _)| *f == c.field).map(|(_, v)| v.clone());
            let v = match supplied {
                Some(v) if c.writable() => v,
                _ if c.default_now => now(),
                _ => Value::Null,
            };
            row.insert(c.field.clone(), v);
        }
        let out = visible(resource, &row);
        table.rows.insert(id, row);
        Ok(out)
    }

    async fn update(&self, resource: &ResolvedResource, id: i64, values: &FieldValues) -> Result<u64, AppError> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let Some(row) = tables.get_mut(&resource.id).and_then(|t| t.rows.get_mut(&id)) else {
            return Ok(0);
        };
        for (field, v) in values {
            if resource.column(field).is_some_and(|c| c.writable()) {
                row.insert(field.clone(), v.clone());
            }
        }
        Ok(1)
    }

    async fn delete(&self, resource: &ResolvedResource, id: i64) -> Result<u64, AppError> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let removed = tables
            .get_mut(&resource.id)
            .and_then(|t| t.rows.remove(&id))
            .is_some();
        Ok(u64::from(removed))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{embedded_catalog, resolve, ResolvedModel};
    use serde_json::json;

    fn model() -> ResolvedModel {
        resolve(&embedded_catalog().unwrap()).unwrap()
    }

    fn vals(pairs: &[(&str, Value)]) -> FieldValues {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_defaults() {
        let m = model();
        let users = m.resource("user").unwrap();
        let store = MemoryStore::new();
        let a = store
            .insert(users, &vals(&[("email", json!("a@x.io")), ("password", json!("secret"))]))
            .await
            .unwrap();
        let b = store.insert(users, &vals(&[("email", json!("b@x.io"))])).await.unwrap();
        assert_eq!(a["user_id"], json!(1));
        assert_eq!(b["user_id"], json!(2));
        assert!(a["created_at"].is_string());
        assert!(!a.contains_key("password"));
        assert_eq!(a["first_name"], Value::Null);
    }

    #[tokio::test]
    async fn list_orders_filters_and_pages() {
        let m = model();
        let forests = m.resource("forest").unwrap();
        let store = MemoryStore::new();
        for (name, status) in [("Pine", "active"), ("Alder", "active"), ("Oak", "closed")] {
            store
                .insert(forests, &vals(&[("forest_name", json!(name)), ("status", json!(status))]))
                .await
                .unwrap();
        }
        let all = store.list(forests, &ListQuery::default()).await.unwrap();
        let names: Vec<_> = all.iter().map(|r| r["forest_name"].clone()).collect();
        assert_eq!(names, vec![json!("Alder"), json!("Oak"), json!("Pine")]);

        let active = store
            .list(
                forests,
                &ListQuery {
                    filters: vals(&[("status", json!("active"))]),
                    limit: Some(1),
                    offset: Some(1),
                },
            )
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0]["forest_name"], json!("Pine"));
    }

    #[tokio::test]
    async fn date_filters_compare_as_values() {
        let m = model();
        let batches = m.resource("harvest_batch").unwrap();
        let moves = m.resource("inventory_transaction").unwrap();
        let store = MemoryStore::new();
        store
            .insert(batches, &vals(&[("harvest_date", json!("2024-03-05"))]))
            .await
            .unwrap();
        store
            .insert(moves, &vals(&[("transaction_date", json!("2024-01-01T00:00:00"))]))
            .await
            .unwrap();

        let filter = |field: &str, raw: &str| ListQuery {
            filters: vals(&[(field, json!(raw))]),
            ..ListQuery::default()
        };
        let hits = |rows: Vec<Record>| rows.len();
        assert_eq!(hits(store.list(batches, &filter("harvest_date", "2024-03-05 00:00:00")).await.unwrap()), 1);
        assert_eq!(hits(store.list(batches, &filter("harvest_date", "2024-03-06")).await.unwrap()), 0);
        assert_eq!(hits(store.list(moves, &filter("transaction_date", "2024-01-01")).await.unwrap()), 1);
        assert_eq!(hits(store.list(moves, &filter("transaction_date", "2024-01-01 00:00:01")).await.unwrap()), 0);
    }

    #[tokio::test]
    async fn update_and_delete_report_rows_touched() {
        let m = model();
        let forests = m.resource("forest").unwrap();
        let store = MemoryStore::new();
        store.insert(forests, &vals(&[("forest_name", json!("Elm"))])).await.unwrap();

        assert_eq!(store.update(forests, 1, &vals(&[("forest_name", json!("Ash"))])).await.unwrap(), 1);
        assert_eq!(store.update(forests, 99, &vals(&[("forest_name", json!("Ash"))])).await.unwrap(), 0);
        assert_eq!(store.read(forests, 1).await.unwrap().unwrap()["forest_name"], json!("Ash"));

        assert_eq!(store.delete(forests, 1).await.unwrap(), 1);
        assert_eq!(store.delete(forests, 1).await.unwrap(), 0);
        assert!(store.read(forests, 1).await.unwrap().is_none());
    }
}
