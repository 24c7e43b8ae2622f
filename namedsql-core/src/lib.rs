//! namedsql core - run SQL by name against any capable database
//!
//! This crate follows hexagonal architecture:
//!
//! - **domain**: Values, rows, contexts, the query store and placeholder rewriting
//! - **ports**: The query source contract and one trait per database capability
//! - **services**: `NamedSql`, the name-resolving wrapper around those traits
//! - **adapters**: Concrete collaborators (DuckDB)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::Path;

use config::Config;

// Re-export commonly used types at crate root
pub use adapters::duckdb::{
    validate_sql_syntax, DuckDbDatabase, DuckDbNamedStatement, DuckDbStatement,
};
pub use domain::result::{Error, OperationResult, Result};
pub use domain::{
    BindStyle, Context, ExecResult, FromRow, FromValue, NamedArgs, QueryStore, Row, Rows,
    SingleRow, Value,
};
pub use ports::QuerySource;
pub use services::NamedSql;

/// Everything needed to run named queries from a working directory
///
/// Holds the resolved configuration, the merged query store and the
/// configured database.
pub struct NamedSqlContext {
    pub config: Config,
    pub queries: NamedSql<QueryStore>,
    pub db: DuckDbDatabase,
}

impl NamedSqlContext {
    /// Load `namedsql.json` from `dir`, its query files and its database
    pub fn new(dir: &Path) -> Result<Self> {
        let config = Config::load(dir)?;
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self> {
        let queries = NamedSql::new(config.load_queries()?);
        let db = config.open_database()?;
        tracing::debug!(
            queries = queries.source().len(),
            database = ?config.database,
            "namedsql context ready"
        );
        Ok(Self {
            config,
            queries,
            db,
        })
    }
}
