//! Lumber ERP API server.
//!
//! Settings come from the environment (see `Settings`); a `.env` file is loaded first.

use lumber_erp::{
    apply_migrations, build_app, embedded_catalog, ensure_database_exists, entity_routes, load_from_path,
    resolve, AppState, MemoryStore, PgStore, RouteTable, Settings, Store, StoreKind,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lumber_erp=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let catalog = match &settings.catalog_path {
        Some(path) => load_from_path(path).await?,
        None => embedded_catalog()?,
    };
    let model = resolve(&catalog)?;

    let store: Arc<dyn Store> = match settings.store {
        StoreKind::Postgres => {
            if settings.auto_migrate {
                ensure_database_exists(&settings.database_url).await?;
            }
            let store = PgStore::connect(&settings.database_url, settings.max_connections).await?;
            tracing::info!("connected to database");
            if settings.auto_migrate {
                apply_migrations(store.pool(), &model).await?;
            }
            Arc::new(store)
        }
        StoreKind::Memory => {
            tracing::warn!("using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(store, model);
    let routes = entity_routes(&state);
    log_endpoints(&routes);
    let app = build_app(state, routes, settings.body_limit);

    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

fn log_endpoints(routes: &RouteTable) {
    tracing::info!(count = routes.len(), "mounted resource endpoints");
    for (path, table) in routes.iter() {
        let verbs: Vec<String> = table.verbs().iter().map(|v| v.to_string()).collect();
        tracing::info!("  {:<28} {}", path, verbs.join(", "));
    }
}
