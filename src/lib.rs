//! Lumber ERP: catalog-driven REST API over PostgreSQL.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod migration;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{embedded_catalog, load_from_path, resolve, Catalog, ResolvedModel, ResolvedResource};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use routes::{build_app, common_routes, entity_routes, RouteTable, VerbTable};
pub use service::CrudService;
pub use settings::{Settings, StoreKind};
pub use state::AppState;
pub use store::{ensure_database_exists, MemoryStore, PgStore, Store};
