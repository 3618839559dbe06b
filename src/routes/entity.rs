//! Resource routes built from the resolved model: one verb table per collection path
//! and one per singular (`?id=`) path.

use crate::config::{Operation, ResolvedResource};
use crate::error::AppError;
use crate::handlers::entity;
use crate::routes::verb::{handler, ApiRequest, Handler, RouteTable, VerbTable};
use crate::state::AppState;
use axum::response::{IntoResponse, Response};
use std::future::Future;
use std::sync::Arc;

/// Close over state and resource so the verb router only passes the request.
fn bind<F, Fut>(state: &AppState, resource: &Arc<ResolvedResource>, f: F) -> Handler
where
    F: Fn(AppState, Arc<ResolvedResource>, ApiRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, AppError>> + Send + 'static,
{
    let state = state.clone();
    let resource = resource.clone();
    handler(move |req| {
        let fut = f(state.clone(), resource.clone(), req);
        async move { fut.await.unwrap_or_else(IntoResponse::into_response) }
    })
}

fn collection_table(state: &AppState, resource: &Arc<ResolvedResource>) -> VerbTable {
    let mut table = VerbTable::new();
    if resource.allows(Operation::List) {
        table = table.get(bind(state, resource, entity::list));
    }
    if resource.allows(Operation::Create) {
        table = table.post(bind(state, resource, entity::create));
    }
    table
}

fn item_table(state: &AppState, resource: &Arc<ResolvedResource>) -> VerbTable {
    let mut table = VerbTable::new();
    if resource.allows(Operation::Read) {
        table = table.get(bind(state, resource, entity::read));
    }
    if resource.allows(Operation::Update) {
        table = table.put(bind(state, resource, entity::update));
    }
    if resource.allows(Operation::Delete) {
        table = table.delete(bind(state, resource, entity::delete));
    }
    table
}

pub fn entity_routes(state: &AppState) -> RouteTable {
    let mut routes = RouteTable::new();
    for resource in &state.model.resources {
        routes.register(resource.collection_route(), collection_table(state, resource));
        if let Some(path) = resource.item_route() {
            routes.register(path, item_table(state, resource));
        }
    }
    routes
}
