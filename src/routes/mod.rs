//! Route assembly: common routes, catalog resources on the verb router, and the app layers.

pub mod common;
pub mod entity;
pub mod verb;

pub use common::common_routes;
pub use entity::entity_routes;
pub use verb::{dispatch, handler, ApiRequest, Handler, RouteTable, Verb, VerbTable};

use crate::error::AppError;
use crate::middleware::cors_headers;
use crate::state::AppState;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

async fn not_found() -> AppError {
    AppError::NotFound("Not found".into())
}

/// Full application: common routes, the resource route table, body limit and CORS on everything.
pub fn build_app(state: AppState, routes: RouteTable, body_limit: usize) -> Router {
    Router::new()
        .merge(common_routes(state))
        .merge(routes.into_router())
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(cors_headers))
                .layer(RequestBodyLimitLayer::new(body_limit)),
        )
}
