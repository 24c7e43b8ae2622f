//! Configuration management
//!
//! Read from `namedsql.json` in the working directory:
//! ```json
//! {
//!   "database": "data.duckdb",
//!   "queries": ["queries.sql", "reports.sql"],
//!   "bindStyle": "question"
//! }
//! ```
//! Every field is optional. `NAMEDSQL_DATABASE` and `NAMEDSQL_BIND_STYLE`
//! override the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::adapters::duckdb::DuckDbDatabase;
use crate::domain::bind::BindStyle;
use crate::domain::result::{Error, Result};
use crate::domain::QueryStore;

/// Name of the settings file inside the working directory
pub const CONFIG_FILE: &str = "namedsql.json";

/// Raw namedsql.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    database: Option<PathBuf>,
    #[serde(default)]
    queries: Vec<PathBuf>,
    #[serde(default)]
    bind_style: Option<BindStyle>,
}

/// Resolved configuration, with paths made absolute against the directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub dir: PathBuf,
    /// Database file; `None` means an in-memory database
    pub database: Option<PathBuf>,
    pub queries: Vec<PathBuf>,
    pub bind_style: BindStyle,
}

impl Config {
    /// Load config from a working directory
    ///
    /// A missing settings file yields the defaults.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut config = Self::from_file(dir)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn from_file(dir: &Path) -> Result<Self> {
        let settings_path = dir.join(CONFIG_FILE);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).map_err(|e| {
                Error::Config(format!("{}: {}", settings_path.display(), e))
            })?
        } else {
            SettingsFile::default()
        };

        Ok(Self {
            dir: dir.to_path_buf(),
            database: raw.database.map(|p| dir.join(p)),
            queries: raw.queries.into_iter().map(|p| dir.join(p)).collect(),
            bind_style: raw.bind_style.unwrap_or_default(),
        })
    }

    /// Apply environment overrides through `lookup` (env var name to value)
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(db) = lookup("NAMEDSQL_DATABASE").filter(|v| !v.is_empty()) {
            self.database = Some(self.resolve(Path::new(&db)));
        }
        if let Some(style) = lookup("NAMEDSQL_BIND_STYLE").filter(|v| !v.is_empty()) {
            self.bind_style = style.parse()?;
        }
        Ok(())
    }

    /// Resolve a user-supplied path against the working directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        }
    }

    /// Load every configured query file into one store
    ///
    /// Later files win when two define the same name.
    pub fn load_queries(&self) -> Result<QueryStore> {
        let stores = self
            .queries
            .iter()
            .map(QueryStore::load_from_file)
            .collect::<Result<Vec<_>>>()?;
        Ok(QueryStore::merge(stores))
    }

    /// Open the configured database, or an in-memory one when none is set
    pub fn open_database(&self) -> Result<DuckDbDatabase> {
        let db = match &self.database {
            Some(path) => DuckDbDatabase::open(path)?,
            None => DuckDbDatabase::open_in_memory()?,
        };
        Ok(db.with_bind_style(self.bind_style))
    }
}
