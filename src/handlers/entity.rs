//! Resource CRUD handlers: list, create, read, update, delete.
//! Each takes the resource it is bound to and the request seen by the verb router.

use crate::config::ResolvedResource;
use crate::error::AppError;
use crate::response::{created, message, ok};
use crate::routes::verb::ApiRequest;
use crate::service::{parse_id, CrudService};
use crate::state::AppState;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

pub async fn list(state: AppState, resource: Arc<ResolvedResource>, req: ApiRequest) -> Result<Response, AppError> {
    let rows = CrudService::list(state.store.as_ref(), &resource, &req.query).await?;
    Ok(ok(rows).into_response())
}

pub async fn create(state: AppState, resource: Arc<ResolvedResource>, req: ApiRequest) -> Result<Response, AppError> {
    let row = CrudService::create(state.store.as_ref(), &resource, &req.body).await?;
    Ok(created(row).into_response())
}

pub async fn read(state: AppState, resource: Arc<ResolvedResource>, req: ApiRequest) -> Result<Response, AppError> {
    let id = parse_id(&req.query)?;
    let row = CrudService::read(state.store.as_ref(), &resource, id).await?;
    Ok(ok(row).into_response())
}

pub async fn update(state: AppState, resource: Arc<ResolvedResource>, req: ApiRequest) -> Result<Response, AppError> {
    let id = parse_id(&req.query)?;
    let text = CrudService::update(state.store.as_ref(), &resource, id, &req.body).await?;
    Ok(message(text).into_response())
}

pub async fn delete(state: AppState, resource: Arc<ResolvedResource>, req: ApiRequest) -> Result<Response, AppError> {
    let id = parse_id(&req.query)?;
    let text = CrudService::delete(state.store.as_ref(), &resource, id).await?;
    Ok(message(text).into_response())
}
