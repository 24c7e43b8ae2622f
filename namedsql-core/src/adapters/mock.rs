//! Recording collaborator for unit tests
//!
//! Implements every capability port, records each call, and either fails
//! with a canned database error or answers from a canned row.

use std::sync::{Arc, Mutex};

use crate::domain::bind::{self, BindStyle};
use crate::domain::result::{Error, Result};
use crate::domain::{Context, ExecResult, FromRow, NamedArgs, Row, Rows, SingleRow, Value};
use crate::ports::*;

/// One recorded delegate call
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub query: String,
    pub args: Vec<Value>,
    pub named: Option<NamedArgs>,
    pub with_context: bool,
}

#[derive(Debug, Default)]
pub struct MockDb {
    calls: Mutex<Vec<Call>>,
    fail_with: Option<String>,
    row: Option<Row>,
}

impl MockDb {
    pub const EXEC_RESULT: ExecResult = ExecResult {
        rows_affected: 1,
        last_insert_id: Some(1),
    };

    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with `Error::Database(msg)`
    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::default()
        }
    }

    /// Fetches answer with `row`
    pub fn with_row(row: Row) -> Self {
        Self {
            row: Some(row),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(
        &self,
        method: &'static str,
        ctx: Option<&Context>,
        query: &str,
        args: &[Value],
        named: Option<&NamedArgs>,
    ) -> Result<()> {
        self.calls.lock().unwrap().push(Call {
            method,
            query: query.to_string(),
            args: args.to_vec(),
            named: named.cloned(),
            with_context: ctx.is_some(),
        });
        match &self.fail_with {
            Some(msg) => Err(Error::database(msg.clone())),
            None => Ok(()),
        }
    }

    fn row(&self) -> Result<Row> {
        self.row.clone().ok_or(Error::NoRows)
    }

    fn rows(&self) -> Rows {
        match &self.row {
            Some(row) => Rows::new(Arc::from(row.columns().to_vec()), vec![row.clone()]),
            None => Rows::empty(),
        }
    }
}

impl Preparer for MockDb {
    type Stmt = String;

    fn prepare(&self, query: &str) -> Result<String> {
        self.record("prepare", None, query, &[], None)?;
        Ok(query.to_string())
    }
}

impl PreparerContext for MockDb {
    type Stmt = String;

    fn prepare_context(&self, ctx: &Context, query: &str) -> Result<String> {
        self.record("prepare_context", Some(ctx), query, &[], None)?;
        Ok(query.to_string())
    }
}

impl Getter for MockDb {
    fn get<T: FromRow>(&self, dest: &mut T, query: &str, args: &[Value]) -> Result<()> {
        self.record("get", None, query, args, None)?;
        *dest = T::from_row(&self.row()?)?;
        Ok(())
    }
}

impl GetterContext for MockDb {
    fn get_context<T: FromRow>(
        &self,
        ctx: &Context,
        dest: &mut T,
        query: &str,
        args: &[Value],
    ) -> Result<()> {
        self.record("get_context", Some(ctx), query, args, None)?;
        *dest = T::from_row(&self.row()?)?;
        Ok(())
    }
}

impl Selecter for MockDb {
    fn select<T: FromRow>(&self, dest: &mut Vec<T>, query: &str, args: &[Value]) -> Result<()> {
        self.record("select", None, query, args, None)?;
        dest.extend(self.rows().scan_all::<T>()?);
        Ok(())
    }
}

impl SelecterContext for MockDb {
    fn select_context<T: FromRow>(
        &self,
        ctx: &Context,
        dest: &mut Vec<T>,
        query: &str,
        args: &[Value],
    ) -> Result<()> {
        self.record("select_context", Some(ctx), query, args, None)?;
        dest.extend(self.rows().scan_all::<T>()?);
        Ok(())
    }
}

impl Queryer for MockDb {
    fn query(&self, query: &str, args: &[Value]) -> Result<Rows> {
        self.record("query", None, query, args, None)?;
        Ok(self.rows())
    }
}

impl QueryerContext for MockDb {
    fn query_context(&self, ctx: &Context, query: &str, args: &[Value]) -> Result<Rows> {
        self.record("query_context", Some(ctx), query, args, None)?;
        Ok(self.rows())
    }
}

impl QueryRower for MockDb {
    fn query_row(&self, query: &str, args: &[Value]) -> SingleRow {
        SingleRow::new(
            self.record("query_row", None, query, args, None)
                .and_then(|_| self.row()),
        )
    }
}

impl QueryRowerContext for MockDb {
    fn query_row_context(&self, ctx: &Context, query: &str, args: &[Value]) -> SingleRow {
        SingleRow::new(
            self.record("query_row_context", Some(ctx), query, args, None)
                .and_then(|_| self.row()),
        )
    }
}

impl Execer for MockDb {
    fn exec(&self, query: &str, args: &[Value]) -> Result<ExecResult> {
        self.record("exec", None, query, args, None)?;
        Ok(Self::EXEC_RESULT)
    }
}

impl ExecerContext for MockDb {
    fn exec_context(&self, ctx: &Context, query: &str, args: &[Value]) -> Result<ExecResult> {
        self.record("exec_context", Some(ctx), query, args, None)?;
        Ok(Self::EXEC_RESULT)
    }
}

impl MustExecer for MockDb {
    fn must_exec(&self, query: &str, args: &[Value]) -> ExecResult {
        if let Err(e) = self.record("must_exec", None, query, args, None) {
            panic!("{}", e);
        }
        Self::EXEC_RESULT
    }
}

impl MustExecerContext for MockDb {
    fn must_exec_context(&self, ctx: &Context, query: &str, args: &[Value]) -> ExecResult {
        if let Err(e) = self.record("must_exec_context", Some(ctx), query, args, None) {
            panic!("{}", e);
        }
        Self::EXEC_RESULT
    }
}

impl Rebinder for MockDb {
    fn rebind(&self, query: &str) -> String {
        // Rebind cannot fail, so a failing mock still answers
        let _ = self.record("rebind", None, query, &[], None);
        bind::rebind(BindStyle::Dollar, query)
    }
}

impl NamedPreparer for MockDb {
    type NamedStmt = String;

    fn prepare_named(&self, query: &str) -> Result<String> {
        self.record("prepare_named", None, query, &[], None)?;
        Ok(query.to_string())
    }
}

impl NamedPreparerContext for MockDb {
    type NamedStmt = String;

    fn prepare_named_context(&self, ctx: &Context, query: &str) -> Result<String> {
        self.record("prepare_named_context", Some(ctx), query, &[], None)?;
        Ok(query.to_string())
    }
}

impl NamedQueryer for MockDb {
    fn named_query(&self, query: &str, arg: &NamedArgs) -> Result<Rows> {
        self.record("named_query", None, query, &[], Some(arg))?;
        Ok(self.rows())
    }
}

impl NamedQueryerContext for MockDb {
    fn named_query_context(&self, ctx: &Context, query: &str, arg: &NamedArgs) -> Result<Rows> {
        self.record("named_query_context", Some(ctx), query, &[], Some(arg))?;
        Ok(self.rows())
    }
}

impl NamedExecer for MockDb {
    fn named_exec(&self, query: &str, arg: &NamedArgs) -> Result<ExecResult> {
        self.record("named_exec", None, query, &[], Some(arg))?;
        Ok(Self::EXEC_RESULT)
    }
}

impl NamedExecerContext for MockDb {
    fn named_exec_context(
        &self,
        ctx: &Context,
        query: &str,
        arg: &NamedArgs,
    ) -> Result<ExecResult> {
        self.record("named_exec_context", Some(ctx), query, &[], Some(arg))?;
        Ok(Self::EXEC_RESULT)
    }
}

impl NamedBinder for MockDb {
    fn bind_named(&self, query: &str, arg: &NamedArgs) -> Result<(String, Vec<Value>)> {
        self.record("bind_named", None, query, &[], Some(arg))?;
        bind::bind_named(query, BindStyle::Question, arg)
    }
}
