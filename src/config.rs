//! Runtime configuration read from the environment.

use std::path::PathBuf;

use crate::fetch::FetchOptions;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/postgres";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Connection string handed to tokio-postgres.
    pub database_url: String,
    /// Also fetch functions and relations living in pg_catalog / information_schema.
    pub include_system_schemas: bool,
    /// Read raw records from this JSON snapshot instead of connecting.
    pub snapshot: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self { database_url: DEFAULT_DATABASE_URL.to_string(), include_system_schemas: false, snapshot: None }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> Self {
        let mut cfg = Config::default();
        if let Some(url) = get("PGREL_DATABASE_URL").filter(|s| !s.trim().is_empty()) { cfg.database_url = url; }
        if let Some(v) = get("PGREL_INCLUDE_SYSTEM") { cfg.include_system_schemas = parse_flag(&v); }
        cfg.snapshot = get("PGREL_SNAPSHOT").filter(|s| !s.trim().is_empty()).map(PathBuf::from);
        cfg
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions { include_system_schemas: self.include_system_schemas }
    }
}

pub fn parse_flag(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
