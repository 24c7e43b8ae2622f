//! NamedSql - run queries by name through any capability collaborator
//!
//! Every wrapper resolves the name first. An unknown name returns
//! `Error::QueryNotFound` without touching the collaborator; otherwise the
//! resolved SQL and the untouched arguments are forwarded and the
//! collaborator's result comes back as-is. Nothing is cached between calls.

use crate::domain::bind;
use crate::domain::result::Result;
use crate::domain::{Context, ExecResult, FromRow, NamedArgs, QueryStore, Rows, SingleRow, Value};
use crate::ports::*;

/// Delegating adapter over a query source
#[derive(Debug, Clone, Default)]
pub struct NamedSql<S = QueryStore> {
    source: S,
}

impl<S: QuerySource> NamedSql<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// The wrapped query source
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    fn resolve(&self, operation: &'static str, name: &str) -> Result<&str> {
        match self.source.raw(name) {
            Ok(sql) => {
                tracing::debug!(operation, query = name, "resolved named query");
                Ok(sql)
            }
            Err(e) => {
                tracing::debug!(operation, query = name, error = %e, "named query lookup failed");
                Err(e)
            }
        }
    }

    /// Resolve or abort; used by the must-exec family
    fn resolve_or_panic(&self, operation: &'static str, name: &str) -> &str {
        match self.resolve(operation, name) {
            Ok(sql) => sql,
            Err(e) => panic!("{}", e),
        }
    }

    // === Statement preparation ===

    pub fn prepare<D: Preparer + ?Sized>(&self, db: &D, name: &str) -> Result<D::Stmt> {
        let query = self.resolve("prepare", name)?;
        db.prepare(query)
    }

    pub fn prepare_context<D: PreparerContext + ?Sized>(
        &self,
        ctx: &Context,
        db: &D,
        name: &str,
    ) -> Result<D::Stmt> {
        let query = self.resolve("prepare_context", name)?;
        db.prepare_context(ctx, query)
    }

    // === Fetching into destinations ===

    pub fn get<D: Getter + ?Sized, T: FromRow>(
        &self,
        db: &D,
        dest: &mut T,
        name: &str,
        args: &[Value],
    ) -> Result<()> {
        let query = self.resolve("get", name)?;
        db.get(dest, query, args)
    }

    pub fn get_context<D: GetterContext + ?Sized, T: FromRow>(
        &self,
        ctx: &Context,
        db: &D,
        dest: &mut T,
        name: &str,
        args: &[Value],
    ) -> Result<()> {
        let query = self.resolve("get_context", name)?;
        db.get_context(ctx, dest, query, args)
    }

    pub fn select<D: Selecter + ?Sized, T: FromRow>(
        &self,
        db: &D,
        dest: &mut Vec<T>,
        name: &str,
        args: &[Value],
    ) -> Result<()> {
        let query = self.resolve("select", name)?;
        db.select(dest, query, args)
    }

    pub fn select_context<D: SelecterContext + ?Sized, T: FromRow>(
        &self,
        ctx: &Context,
        db: &D,
        dest: &mut Vec<T>,
        name: &str,
        args: &[Value],
    ) -> Result<()> {
        let query = self.resolve("select_context", name)?;
        db.select_context(ctx, dest, query, args)
    }

    // === Row sets ===

    pub fn query<D: Queryer + ?Sized>(&self, db: &D, name: &str, args: &[Value]) -> Result<Rows> {
        let query = self.resolve("query", name)?;
        db.query(query, args)
    }

    pub fn query_context<D: QueryerContext + ?Sized>(
        &self,
        ctx: &Context,
        db: &D,
        name: &str,
        args: &[Value],
    ) -> Result<Rows> {
        let query = self.resolve("query_context", name)?;
        db.query_context(ctx, query, args)
    }

    /// The outer `Result` only reports lookup failures; database errors
    /// stay deferred inside the `SingleRow`.
    pub fn query_row<D: QueryRower + ?Sized>(
        &self,
        db: &D,
        name: &str,
        args: &[Value],
    ) -> Result<SingleRow> {
        let query = self.resolve("query_row", name)?;
        Ok(db.query_row(query, args))
    }

    pub fn query_row_context<D: QueryRowerContext + ?Sized>(
        &self,
        ctx: &Context,
        db: &D,
        name: &str,
        args: &[Value],
    ) -> Result<SingleRow> {
        let query = self.resolve("query_row_context", name)?;
        Ok(db.query_row_context(ctx, query, args))
    }

    // === Execution ===

    pub fn exec<D: Execer + ?Sized>(&self, db: &D, name: &str, args: &[Value]) -> Result<ExecResult> {
        let query = self.resolve("exec", name)?;
        db.exec(query, args)
    }

    pub fn exec_context<D: ExecerContext + ?Sized>(
        &self,
        ctx: &Context,
        db: &D,
        name: &str,
        args: &[Value],
    ) -> Result<ExecResult> {
        let query = self.resolve("exec_context", name)?;
        db.exec_context(ctx, query, args)
    }

    /// Execute or crash
    ///
    /// # Panics
    ///
    /// Panics if `name` is not in the query source. The collaborator is not
    /// called in that case.
    pub fn must_exec<D: MustExecer + ?Sized>(&self, db: &D, name: &str, args: &[Value]) -> ExecResult {
        let query = self.resolve_or_panic("must_exec", name);
        db.must_exec(query, args)
    }

    /// # Panics
    ///
    /// Panics if `name` is not in the query source.
    pub fn must_exec_context<D: MustExecerContext + ?Sized>(
        &self,
        ctx: &Context,
        db: &D,
        name: &str,
        args: &[Value],
    ) -> ExecResult {
        let query = self.resolve_or_panic("must_exec_context", name);
        db.must_exec_context(ctx, query, args)
    }

    pub fn rebind<D: Rebinder + ?Sized>(&self, db: &D, name: &str) -> Result<String> {
        let query = self.resolve("rebind", name)?;
        Ok(db.rebind(query))
    }

    // === Named parameters ===

    pub fn prepare_named<D: NamedPreparer + ?Sized>(&self, db: &D, name: &str) -> Result<D::NamedStmt> {
        let query = self.resolve("prepare_named", name)?;
        db.prepare_named(query)
    }

    pub fn prepare_named_context<D: NamedPreparerContext + ?Sized>(
        &self,
        ctx: &Context,
        db: &D,
        name: &str,
    ) -> Result<D::NamedStmt> {
        let query = self.resolve("prepare_named_context", name)?;
        db.prepare_named_context(ctx, query)
    }

    pub fn named_query<D: NamedQueryer + ?Sized>(
        &self,
        db: &D,
        name: &str,
        arg: &NamedArgs,
    ) -> Result<Rows> {
        let query = self.resolve("named_query", name)?;
        db.named_query(query, arg)
    }

    pub fn named_query_context<D: NamedQueryerContext + ?Sized>(
        &self,
        ctx: &Context,
        db: &D,
        name: &str,
        arg: &NamedArgs,
    ) -> Result<Rows> {
        let query = self.resolve("named_query_context", name)?;
        db.named_query_context(ctx, query, arg)
    }

    pub fn named_exec<D: NamedExecer + ?Sized>(
        &self,
        db: &D,
        name: &str,
        arg: &NamedArgs,
    ) -> Result<ExecResult> {
        let query = self.resolve("named_exec", name)?;
        db.named_exec(query, arg)
    }

    pub fn named_exec_context<D: NamedExecerContext + ?Sized>(
        &self,
        ctx: &Context,
        db: &D,
        name: &str,
        arg: &NamedArgs,
    ) -> Result<ExecResult> {
        let query = self.resolve("named_exec_context", name)?;
        db.named_exec_context(ctx, query, arg)
    }

    pub fn bind_named<D: NamedBinder + ?Sized>(
        &self,
        db: &D,
        name: &str,
        arg: &NamedArgs,
    ) -> Result<(String, Vec<Value>)> {
        let query = self.resolve("bind_named", name)?;
        db.bind_named(query, arg)
    }

    // === IN (?) expansion ===

    /// Resolve `name` and expand list arguments into `IN (?, ?, ...)`
    ///
    /// Lookup failures report `QueryNotFound`; rewriting failures report
    /// `Expansion`.
    pub fn expand_in(&self, name: &str, args: &[Value]) -> Result<(String, Vec<Value>)> {
        let query = self.resolve("expand_in", name)?;
        bind::expand_in(query, args)
    }
}
