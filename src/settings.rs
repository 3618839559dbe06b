//! Process settings from environment variables (a `.env` file is honoured by the binary).

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Which `Store` implementation backs the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    /// In-process tables; data is lost on exit.
    Memory,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub auto_migrate: bool,
    pub catalog_path: Option<PathBuf>,
    pub store: StoreKind,
    pub body_limit: usize,
}

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/lumber_erp";
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: DEFAULT_DATABASE_URL.into(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_connections: 5,
            auto_migrate: false,
            catalog_path: None,
            store: StoreKind::Postgres,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut s = Settings::default();
        if let Some(url) = lookup("DATABASE_URL") {
            s.database_url = url;
        }
        if let Some(addr) = lookup("LUMBER_BIND_ADDR") {
            s.bind_addr = addr
                .parse()
                .map_err(|e| ConfigError::Settings(format!("LUMBER_BIND_ADDR '{}': {}", addr, e)))?;
        }
        if let Some(n) = lookup("LUMBER_MAX_CONNECTIONS") {
            s.max_connections = n
                .parse()
                .map_err(|e| ConfigError::Settings(format!("LUMBER_MAX_CONNECTIONS '{}': {}", n, e)))?;
        }
        if let Some(v) = lookup("LUMBER_AUTO_MIGRATE") {
            s.auto_migrate = parse_bool(&v)
                .ok_or_else(|| ConfigError::Settings(format!("LUMBER_AUTO_MIGRATE '{}': expected true or false", v)))?;
        }
        s.catalog_path = lookup("LUMBER_CATALOG_PATH")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        if let Some(kind) = lookup("LUMBER_STORE") {
            s.store = match kind.to_lowercase().as_str() {
                "postgres" | "pg" => StoreKind::Postgres,
                "memory" => StoreKind::Memory,
                _ => {
                    return Err(ConfigError::Settings(format!(
                        "LUMBER_STORE '{}': expected postgres or memory",
                        kind
                    )))
                }
            };
        }
        if let Some(n) = lookup("LUMBER_BODY_LIMIT") {
            s.body_limit = n
                .parse()
                .map_err(|e| ConfigError::Settings(format!("LUMBER_BODY_LIMIT '{}': {}", n, e)))?;
        }
        Ok(s)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
