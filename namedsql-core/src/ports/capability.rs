//! Capability ports - one narrow trait per database operation family
//!
//! Each trait mirrors a single extended-client method that takes raw SQL.
//! `NamedSql` needs exactly one of them per wrapper, so a collaborator only
//! implements what its callers use. `DuckDbDatabase` implements them all.

use crate::domain::result::Result;
use crate::domain::{Context, ExecResult, FromRow, NamedArgs, Rows, SingleRow, Value};

// === Statement preparation ===

/// Used by `NamedSql::prepare`
pub trait Preparer {
    type Stmt;

    fn prepare(&self, query: &str) -> Result<Self::Stmt>;
}

/// Used by `NamedSql::prepare_context`
pub trait PreparerContext {
    type Stmt;

    fn prepare_context(&self, ctx: &Context, query: &str) -> Result<Self::Stmt>;
}

// === Fetching into destinations ===

/// Used by `NamedSql::get`
///
/// Scans the first result row into `dest`.
pub trait Getter {
    fn get<T: FromRow>(&self, dest: &mut T, query: &str, args: &[Value]) -> Result<()>;
}

/// Used by `NamedSql::get_context`
pub trait GetterContext {
    fn get_context<T: FromRow>(
        &self,
        ctx: &Context,
        dest: &mut T,
        query: &str,
        args: &[Value],
    ) -> Result<()>;
}

/// Used by `NamedSql::select`
///
/// Appends every result row to `dest`.
pub trait Selecter {
    fn select<T: FromRow>(&self, dest: &mut Vec<T>, query: &str, args: &[Value]) -> Result<()>;
}

/// Used by `NamedSql::select_context`
pub trait SelecterContext {
    fn select_context<T: FromRow>(
        &self,
        ctx: &Context,
        dest: &mut Vec<T>,
        query: &str,
        args: &[Value],
    ) -> Result<()>;
}

// === Row sets ===

/// Used by `NamedSql::query`
pub trait Queryer {
    fn query(&self, query: &str, args: &[Value]) -> Result<Rows>;
}

/// Used by `NamedSql::query_context`
pub trait QueryerContext {
    fn query_context(&self, ctx: &Context, query: &str, args: &[Value]) -> Result<Rows>;
}

/// Used by `NamedSql::query_row`
///
/// Errors are deferred into the returned `SingleRow`.
pub trait QueryRower {
    fn query_row(&self, query: &str, args: &[Value]) -> SingleRow;
}

/// Used by `NamedSql::query_row_context`
pub trait QueryRowerContext {
    fn query_row_context(&self, ctx: &Context, query: &str, args: &[Value]) -> SingleRow;
}

// === Execution ===

/// Used by `NamedSql::exec`
pub trait Execer {
    fn exec(&self, query: &str, args: &[Value]) -> Result<ExecResult>;
}

/// Used by `NamedSql::exec_context`
pub trait ExecerContext {
    fn exec_context(&self, ctx: &Context, query: &str, args: &[Value]) -> Result<ExecResult>;
}

/// Used by `NamedSql::must_exec`
///
/// Implementations panic instead of returning an error.
pub trait MustExecer {
    fn must_exec(&self, query: &str, args: &[Value]) -> ExecResult;
}

/// Used by `NamedSql::must_exec_context`
pub trait MustExecerContext {
    fn must_exec_context(&self, ctx: &Context, query: &str, args: &[Value]) -> ExecResult;
}

/// Used by `NamedSql::rebind`
pub trait Rebinder {
    fn rebind(&self, query: &str) -> String;
}

// === Named parameters ===

/// Used by `NamedSql::prepare_named`
pub trait NamedPreparer {
    type NamedStmt;

    fn prepare_named(&self, query: &str) -> Result<Self::NamedStmt>;
}

/// Used by `NamedSql::prepare_named_context`
pub trait NamedPreparerContext {
    type NamedStmt;

    fn prepare_named_context(&self, ctx: &Context, query: &str) -> Result<Self::NamedStmt>;
}

/// Used by `NamedSql::named_query`
pub trait NamedQueryer {
    fn named_query(&self, query: &str, arg: &NamedArgs) -> Result<Rows>;
}

/// Used by `NamedSql::named_query_context`
pub trait NamedQueryerContext {
    fn named_query_context(&self, ctx: &Context, query: &str, arg: &NamedArgs) -> Result<Rows>;
}

/// Used by `NamedSql::named_exec`
pub trait NamedExecer {
    fn named_exec(&self, query: &str, arg: &NamedArgs) -> Result<ExecResult>;
}

/// Used by `NamedSql::named_exec_context`
pub trait NamedExecerContext {
    fn named_exec_context(
        &self,
        ctx: &Context,
        query: &str,
        arg: &NamedArgs,
    ) -> Result<ExecResult>;
}

/// Used by `NamedSql::bind_named`
pub trait NamedBinder {
    fn bind_named(&self, query: &str, arg: &NamedArgs) -> Result<(String, Vec<Value>)>;
}
