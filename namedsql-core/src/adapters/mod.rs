//! Adapter implementations
//!
//! Adapters implement the capability ports with concrete technologies:
//! - DuckDB for every capability (bundled collaborator)
//! - A recording mock for unit tests

pub mod duckdb;

#[cfg(test)]
pub mod mock;
