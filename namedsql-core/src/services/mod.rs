//! Service layer
//!
//! `NamedSql` resolves query names and hands the SQL to a collaborator.

mod named_sql;

pub use named_sql::NamedSql;
