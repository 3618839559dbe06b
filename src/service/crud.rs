//! Generic CRUD over any catalog resource and any `Store`.

use crate::config::ResolvedResource;
use crate::error::AppError;
use crate::service::record::{parse_count, RecordDecoder};
use crate::store::{ListQuery, Record, Store};
use std::collections::HashMap;

pub struct CrudService;

impl CrudService {
    /// List rows with optional exact-match filters, `limit` (max 1000) and `offset`.
    pub async fn list(
        store: &dyn Store,
        resource: &ResolvedResource,
        params: &HashMap<String, String>,
    ) -> Result<Vec<Record>, AppError> {
        let query = ListQuery {
            filters: RecordDecoder::filters(resource, params)?,
            limit: parse_count(params, "limit")?,
            offset: parse_count(params, "offset")?,
        };
        let rows = store.list(resource, &query).await?;
        Ok(rows.into_iter().map(|r| present(resource, r)).collect())
    }

    pub async fn read(store: &dyn Store, resource: &ResolvedResource, id: i64) -> Result<Record, AppError> {
        store
            .read(resource, id)
            .await?
            .map(|r| present(resource, r))
            .ok_or_else(|| AppError::NotFound(format!("{} not found", resource.label)))
    }

    /// Insert from a raw body. Returns the stored row.
    pub async fn create(store: &dyn Store, resource: &ResolvedResource, body: &[u8]) -> Result<Record, AppError> {
        let body = RecordDecoder::parse_body(body)?;
        let values = RecordDecoder::for_create(resource, &body)?;
        let row = store.insert(resource, &values).await?;
        tracing::info!(resource = %resource.id, id = ?row.get(&resource.pk_field), "created");
        Ok(present(resource, row))
    }

    /// Full replace by id. Returns the success message; a missing row is not an error.
    pub async fn update(
        store: &dyn Store,
        resource: &ResolvedResource,
        id: i64,
        body: &[u8],
    ) -> Result<String, AppError> {
        let body = RecordDecoder::parse_body(body)?;
        let values = RecordDecoder::for_update(resource, &body)?;
        let rows = store.update(resource, id, &values).await?;
        tracing::info!(resource = %resource.id, id, rows, "updated");
        Ok(format!("{} updated successfully", resource.label))
    }

    /// Delete by id. Returns the success message; a missing row is not an error.
    pub async fn delete(store: &dyn Store, resource: &ResolvedResource, id: i64) -> Result<String, AppError> {
        let rows = store.delete(resource, id).await?;
        tracing::info!(resource = %resource.id, id, rows, "deleted");
        Ok(format!("{} deleted successfully", resource.label))
    }
}

/// Drop write-only fields before a row leaves the service.
fn present(resource: &ResolvedResource, mut row: Record) -> Record {
    for c in resource.columns.iter().filter(|c| c.write_only) {
        row.remove(&c.field);
    }
    row
}
