//! PostgreSQL store over a sqlx pool.

use super::{FieldValues, ListQuery, Record, Store, TIMESTAMP_FORMAT};
use crate::config::{ColumnType, ResolvedResource};
use crate::error::{AppError, ConfigError};
use crate::sql::{self, PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{ConnectOptions, PgPool, Row};
use std::str::FromStr;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    /// Open a pool and make sure the server answers.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        let store = PgStore::new(pool);
        store.ping().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_all(&self, resource: &ResolvedResource, q: &QueryBuf) -> Result<Vec<Record>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(|r| row_to_record(resource, r)).collect())
    }

    async fn execute(&self, q: &QueryBuf) -> Result<u64, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        Ok(query.execute(&self.pool).await?.rows_affected())
    }
}

/// Convert checked field values to bind values using each column's declared type.
fn bind_values(resource: &ResolvedResource, values: &FieldValues) -> Result<Vec<(String, PgBindValue)>, AppError> {
    values
        .iter()
        .filter_map(|(field, v)| {
            let ty = if *field == resource.pk_field {
                ColumnType::Integer
            } else {
                resource.column(field)?.type_
            };
            Some(PgBindValue::from_json(v, ty).map(|b| (field.clone(), b)))
        })
        .collect()
}

#[async_trait]
impl Store for PgStore {
    async fn list(&self, resource: &ResolvedResource, query: &ListQuery) -> Result<Vec<Record>, AppError> {
        let filters = bind_values(resource, &query.filters)?;
        let q = sql::select_list(resource, &filters, query.limit, query.offset);
        self.fetch_all(resource, &q).await
    }

    async fn read(&self, resource: &ResolvedResource, id: i64) -> Result<Option<Record>, AppError> {
        let mut q = sql::select_by_id(resource);
        q.params.push(PgBindValue::I64(id));
        Ok(self.fetch_all(resource, &q).await?.into_iter().next())
    }

    async fn insert(&self, resource: &ResolvedResource, values: &FieldValues) -> Result<Record, AppError> {
        let binds = bind_values(resource, values)?;
        let q = sql::insert(resource, &binds);
        self.fetch_all(resource, &q)
            .await?
            .into_iter()
            .next()
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    async fn update(&self, resource: &ResolvedResource, id: i64, values: &FieldValues) -> Result<u64, AppError> {
        let binds = bind_values(resource, values)?;
        match sql::update(resource, id, &binds) {
            Some(q) => self.execute(&q).await,
            // Nothing to set: report whether the row exists.
            None => Ok(self.read(resource, id).await?.map_or(0, |_| 1)),
        }
    }

    async fn delete(&self, resource: &ResolvedResource, id: i64) -> Result<u64, AppError> {
        let mut q = sql::delete(resource);
        q.params.push(PgBindValue::I64(id));
        self.execute(&q).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn row_to_record(resource: &ResolvedResource, row: &PgRow) -> Record {
    let mut map = Record::new();
    map.insert(
        resource.pk_field.clone(),
        cell_to_value(row, &resource.pk_field, ColumnType::Integer),
    );
    for c in resource.readable_columns() {
        map.insert(c.field.clone(), cell_to_value(row, &c.field, c.type_));
    }
    map
}

fn cell_to_value(row: &PgRow, name: &str, ty: ColumnType) -> Value {
    match ty {
        ColumnType::Integer => {
            if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
                return Value::Number(n.into());
            }
            if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
                return Value::Number(n.into());
            }
            if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
                return Value::Number(n.into());
            }
        }
        ColumnType::Float => {
            if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
                if let Some(n) = serde_json::Number::from_f64(n) {
                    return Value::Number(n);
                }
            }
        }
        ColumnType::Boolean => {
            if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
                return Value::Bool(b);
            }
        }
        ColumnType::Date => {
            if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
                return Value::String(d.format("%Y-%m-%d").to_string());
            }
        }
        ColumnType::Timestamp => {
            if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
                return Value::String(d.format(TIMESTAMP_FORMAT).to_string());
            }
            if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
                return Value::String(d.to_rfc3339());
            }
        }
        ColumnType::Text => {}
    }
    // Text columns, and typed columns stored as text in older schemas.
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    Value::Null
}

/// Create the target database when missing, connecting through the `postgres` maintenance database.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| ConfigError::Settings(format!("DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), ConfigError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| ConfigError::Settings("DATABASE_URL: no database path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}
