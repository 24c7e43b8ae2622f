//! CLI command implementations

pub mod check;
pub mod list;
pub mod run;
pub mod show;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use namedsql_core::config::Config;
use namedsql_core::QueryStore;

/// Working directory from NAMEDSQL_DIR, or the current directory
pub fn get_dir() -> Result<PathBuf> {
    match std::env::var("NAMEDSQL_DIR") {
        Ok(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => std::env::current_dir().context("Failed to read current directory"),
    }
}

/// Load namedsql.json from the working directory
pub fn get_config() -> Result<Config> {
    let dir = get_dir()?;
    Config::load(&dir).with_context(|| format!("Failed to load config from {}", dir.display()))
}

/// Query store from explicit files, falling back to the configured ones
pub fn load_store(config: &Config, files: &[PathBuf]) -> Result<QueryStore> {
    if files.is_empty() {
        if config.queries.is_empty() {
            anyhow::bail!(
                "No query files. Pass one or list them under \"queries\" in namedsql.json."
            );
        }
        return config.load_queries().context("Failed to load query files");
    }

    let stores = files
        .iter()
        .map(|f| load_file(&config.resolve(f)))
        .collect::<Result<Vec<_>>>()?;
    Ok(QueryStore::merge(stores))
}

fn load_file(path: &Path) -> Result<QueryStore> {
    QueryStore::load_from_file(path)
        .with_context(|| format!("Failed to load query file: {}", path.display()))
}
