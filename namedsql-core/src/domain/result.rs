//! Result and error types for the core library

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// `QueryNotFound` is the only error the adapter itself produces before
/// delegating; `Expansion` comes from `IN (?)` rewriting. Everything else
/// is raised by collaborators or the query loader and is passed through
/// untouched.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Query not found: {0}")]
    QueryNotFound(String),

    #[error("Duplicate query name: {0}")]
    DuplicateQuery(String),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Expansion error: {0}")]
    Expansion(String),

    #[error("Bind error: {0}")]
    Bind(String),

    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("No rows in result set")]
    NoRows,

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Context cancelled")]
    Cancelled,

    #[error("Context deadline exceeded")]
    DeadlineExceeded,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a query-not-found error
    pub fn query_not_found(name: impl Into<String>) -> Self {
        Self::QueryNotFound(name.into())
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create an expansion error
    pub fn expansion(msg: impl Into<String>) -> Self {
        Self::Expansion(msg.into())
    }

    /// Create a bind error
    pub fn bind(msg: impl Into<String>) -> Self {
        Self::Bind(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// True when the error is a name lookup failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::QueryNotFound(_))
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Serializable operation envelope (used for `--json` output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(e.to_string()),
        }
    }
}
