//! DuckDB collaborator - implements every capability port

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use duckdb::types::{ListType, ValueRef};
use duckdb::{Connection, ToSql};
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;

use crate::domain::bind::{self, BindStyle};
use crate::domain::result::{Error, Result};
use crate::domain::{Context, ExecResult, FromRow, NamedArgs, Row, Rows, SingleRow, Value};
use crate::ports::*;

/// Validate SQL syntax without touching a database
pub fn validate_sql_syntax(sql: &str) -> Result<()> {
    let dialect = DuckDbDialect {};
    Parser::parse_sql(&dialect, sql).map_err(|e| {
        let msg = e.to_string();
        let cleaned = msg.trim_start_matches("sql parser error: ");
        Error::Syntax(cleaned.to_string())
    })?;
    Ok(())
}

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| Error::database("connection mutex poisoned"))
}

/// Run `f` on the locked connection, honouring `ctx` on both sides of the lock
fn with_conn<T>(
    conn: &Mutex<Connection>,
    ctx: Option<&Context>,
    f: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
    if let Some(ctx) = ctx {
        ctx.err()?;
    }
    let guard = lock(conn)?;
    if let Some(ctx) = ctx {
        ctx.err()?;
    }
    f(&guard)
}

fn to_duckdb_param(value: &Value) -> Result<duckdb::types::Value> {
    use duckdb::types::Value as Db;

    Ok(match value {
        Value::Null => Db::Null,
        Value::Bool(b) => Db::Boolean(*b),
        Value::Int(i) => Db::BigInt(*i),
        Value::Float(f) => Db::Double(*f),
        Value::Text(s) => Db::Text(s.clone()),
        Value::Blob(bytes) => Db::Blob(bytes.clone()),
        Value::List(_) => {
            return Err(Error::bind(
                "list arguments must be expanded with expand_in before execution",
            ))
        }
    })
}

fn to_duckdb_params(args: &[Value]) -> Result<Vec<duckdb::types::Value>> {
    args.iter().map(to_duckdb_param).collect()
}

fn column_value(row: &duckdb::Row, idx: usize) -> Value {
    match row.get_ref(idx) {
        Ok(ValueRef::Null) => Value::Null,
        Ok(ValueRef::Boolean(b)) => Value::Bool(b),
        Ok(ValueRef::TinyInt(i)) => Value::Int(i64::from(i)),
        Ok(ValueRef::SmallInt(i)) => Value::Int(i64::from(i)),
        Ok(ValueRef::Int(i)) => Value::Int(i64::from(i)),
        Ok(ValueRef::BigInt(i)) => Value::Int(i),
        Ok(ValueRef::HugeInt(i)) => i64::try_from(i)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Text(i.to_string())),
        Ok(ValueRef::UTinyInt(i)) => Value::Int(i64::from(i)),
        Ok(ValueRef::USmallInt(i)) => Value::Int(i64::from(i)),
        Ok(ValueRef::UInt(i)) => Value::Int(i64::from(i)),
        Ok(ValueRef::UBigInt(i)) => i64::try_from(i)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Text(i.to_string())),
        Ok(ValueRef::Float(f)) => Value::Float(f64::from(f)),
        Ok(ValueRef::Double(f)) => Value::Float(f),
        Ok(ValueRef::Decimal(d)) => {
            let s = d.to_string();
            match s.parse::<f64>() {
                Ok(f) => Value::Float(f),
                // Fallback for very large decimals
                Err(_) => Value::Text(s),
            }
        }
        Ok(ValueRef::Text(bytes)) => Value::Text(String::from_utf8_lossy(bytes).to_string()),
        Ok(ValueRef::Blob(bytes)) => Value::Blob(bytes.to_vec()),
        Ok(ValueRef::Date32(days)) => {
            let date = chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
                .map(|epoch| epoch + chrono::Duration::days(i64::from(days)));
            match date {
                Some(date) => Value::Text(date.to_string()),
                None => Value::Int(i64::from(days)),
            }
        }
        Ok(ValueRef::Timestamp(_, ts)) => {
            // Microseconds since epoch
            let dt = chrono::DateTime::from_timestamp_micros(ts)
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_else(|| ts.to_string());
            Value::Text(dt)
        }
        Ok(ValueRef::Time64(_, t)) => Value::Int(t),
        Ok(ValueRef::Interval {
            months,
            days,
            nanos,
        }) => Value::Text(format!("{} months {} days {} ns", months, days, nanos)),
        Ok(ValueRef::List(list_type, list_idx)) => list_value(&list_type, list_idx),
        Ok(ValueRef::Enum(_, idx)) => Value::Int(idx as i64),
        _ => Value::Null,
    }
}

/// VARCHAR[] columns become lists of text; other list types are rendered as text
fn list_value(list_type: &ListType, idx: usize) -> Value {
    use duckdb::arrow::array::{Array, StringArray};

    let values = match list_type {
        ListType::Regular(arr) => {
            if arr.is_null(idx) {
                return Value::Null;
            }
            arr.value(idx)
        }
        ListType::Large(arr) => {
            if arr.is_null(idx) {
                return Value::Null;
            }
            arr.value(idx)
        }
    };

    match values.as_any().downcast_ref::<StringArray>() {
        Some(strings) => Value::List(
            (0..strings.len())
                .map(|i| {
                    if strings.is_null(i) {
                        Value::Null
                    } else {
                        Value::Text(strings.value(i).to_string())
                    }
                })
                .collect(),
        ),
        None => Value::Text(format!("{:?}", values)),
    }
}

/// Prepare (through the statement cache), bind and materialize all rows
fn run_query(conn: &Connection, sql: &str, args: &[Value]) -> Result<Rows> {
    let params = to_duckdb_params(args)?;
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();

    let mut stmt = conn.prepare_cached(sql)?;
    let mut result_rows = stmt.query(param_refs.as_slice())?;

    let mut values: Vec<Vec<Value>> = Vec::new();
    let mut column_count = 0;

    while let Some(row) = result_rows.next()? {
        if values.is_empty() {
            column_count = row.as_ref().column_count();
        }
        values.push((0..column_count).map(|i| column_value(row, i)).collect());
    }

    // Drop result_rows to release borrow on stmt
    drop(result_rows);

    let count = if column_count > 0 {
        column_count
    } else {
        stmt.column_count()
    };
    let columns: Arc<[String]> = (0..count)
        .map(|i| {
            stmt.column_name(i)
                .map(|s| s.to_string())
                .unwrap_or_else(|_| format!("col{}", i))
        })
        .collect::<Vec<_>>()
        .into();

    let rows = values
        .into_iter()
        .map(|v| Row::new(Arc::clone(&columns), v))
        .collect();
    Ok(Rows::new(columns, rows))
}

fn run_exec(conn: &Connection, sql: &str, args: &[Value]) -> Result<ExecResult> {
    let params = to_duckdb_params(args)?;
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();

    let mut stmt = conn.prepare_cached(sql)?;
    let affected = stmt.execute(param_refs.as_slice())?;
    Ok(ExecResult::new(affected as u64))
}

fn first_row(rows: Rows) -> Result<Row> {
    rows.into_iter().next().ok_or(Error::NoRows)
}

/// DuckDB database shared by every capability call
///
/// The connection sits behind a mutex, so calls from several threads are
/// serialized here rather than in the caller.
#[derive(Clone)]
pub struct DuckDbDatabase {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
    bind_style: BindStyle,
}

impl DuckDbDatabase {
    /// Open (or create) a database file
    ///
    /// Retries with exponential backoff on file locking errors, which show
    /// up when several processes open the same file at once.
    pub fn open(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self::from_connection(conn, Some(db_path.to_path_buf())));
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            path = %db_path.display(),
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            error = %err_msg,
                            "database busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!(
                "Failed to open database after {} retries",
                MAX_RETRIES
            ))
        }))
    }

    /// Open a transient in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self::from_connection(conn, None))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; JSON is linked in through the crate feature
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn from_connection(conn: Connection, db_path: Option<PathBuf>) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
            bind_style: BindStyle::Question,
        }
    }

    /// Bindvar style reported by `rebind` and `bind_named`
    pub fn with_bind_style(mut self, style: BindStyle) -> Self {
        self.bind_style = style;
        self
    }

    pub fn bind_style(&self) -> BindStyle {
        self.bind_style
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run one or more statements without parameters (schema setup)
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        with_conn(&self.conn, None, |conn| Ok(conn.execute_batch(sql)?))
    }

    fn query_rows(&self, ctx: Option<&Context>, query: &str, args: &[Value]) -> Result<Rows> {
        with_conn(&self.conn, ctx, |conn| run_query(conn, query, args))
    }

    fn exec_rows(&self, ctx: Option<&Context>, query: &str, args: &[Value]) -> Result<ExecResult> {
        with_conn(&self.conn, ctx, |conn| run_exec(conn, query, args))
    }

    fn prepare_statement(&self, ctx: Option<&Context>, query: &str) -> Result<DuckDbStatement> {
        with_conn(&self.conn, ctx, |conn| {
            // Surface syntax and catalog errors now rather than at first use
            conn.prepare(query)?;
            Ok(())
        })?;
        Ok(DuckDbStatement {
            conn: Arc::clone(&self.conn),
            sql: query.to_string(),
        })
    }

    fn prepare_named_statement(
        &self,
        ctx: Option<&Context>,
        query: &str,
    ) -> Result<DuckDbNamedStatement> {
        let (sql, names) = bind::compile_named(query, BindStyle::Question);
        let inner = self.prepare_statement(ctx, &sql)?;
        Ok(DuckDbNamedStatement {
            inner,
            names,
            source: query.to_string(),
        })
    }

    fn named_rows(&self, ctx: Option<&Context>, query: &str, arg: &NamedArgs) -> Result<Rows> {
        let (sql, values) = bind::bind_named(query, BindStyle::Question, arg)?;
        self.query_rows(ctx, &sql, &values)
    }

    fn named_exec_rows(
        &self,
        ctx: Option<&Context>,
        query: &str,
        arg: &NamedArgs,
    ) -> Result<ExecResult> {
        let (sql, values) = bind::bind_named(query, BindStyle::Question, arg)?;
        self.exec_rows(ctx, &sql, &values)
    }
}

impl std::fmt::Debug for DuckDbDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbDatabase")
            .field("db_path", &self.db_path)
            .field("bind_style", &self.bind_style)
            .finish()
    }
}

/// Prepared statement handle
///
/// Owns its SQL and re-prepares through DuckDB's statement cache on each
/// use, so it can outlive the connection lock.
#[derive(Clone)]
pub struct DuckDbStatement {
    conn: Arc<Mutex<Connection>>,
    sql: String,
}

impl DuckDbStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn query(&self, args: &[Value]) -> Result<Rows> {
        with_conn(&self.conn, None, |conn| run_query(conn, &self.sql, args))
    }

    pub fn query_context(&self, ctx: &Context, args: &[Value]) -> Result<Rows> {
        with_conn(&self.conn, Some(ctx), |conn| run_query(conn, &self.sql, args))
    }

    pub fn query_row(&self, args: &[Value]) -> SingleRow {
        SingleRow::new(self.query(args).and_then(first_row))
    }

    pub fn exec(&self, args: &[Value]) -> Result<ExecResult> {
        with_conn(&self.conn, None, |conn| run_exec(conn, &self.sql, args))
    }

    pub fn exec_context(&self, ctx: &Context, args: &[Value]) -> Result<ExecResult> {
        with_conn(&self.conn, Some(ctx), |conn| run_exec(conn, &self.sql, args))
    }

    pub fn get<T: FromRow>(&self, args: &[Value]) -> Result<T> {
        T::from_row(&first_row(self.query(args)?)?)
    }

    pub fn select<T: FromRow>(&self, args: &[Value]) -> Result<Vec<T>> {
        self.query(args)?.scan_all()
    }
}

impl std::fmt::Debug for DuckDbStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbStatement").field("sql", &self.sql).finish()
    }
}

/// Prepared statement taking `:name` arguments
#[derive(Debug, Clone)]
pub struct DuckDbNamedStatement {
    inner: DuckDbStatement,
    names: Vec<String>,
    source: String,
}

impl DuckDbNamedStatement {
    /// SQL as written, with `:name` parameters
    pub fn source(&self) -> &str {
        &self.source
    }

    /// SQL as executed, with `?` bindvars
    pub fn sql(&self) -> &str {
        self.inner.sql()
    }

    /// Parameter names in bindvar order (repeats included)
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn query(&self, arg: &NamedArgs) -> Result<Rows> {
        self.inner.query(&bind::lookup_named(&self.names, arg)?)
    }

    pub fn exec(&self, arg: &NamedArgs) -> Result<ExecResult> {
        self.inner.exec(&bind::lookup_named(&self.names, arg)?)
    }

    pub fn get<T: FromRow>(&self, arg: &NamedArgs) -> Result<T> {
        self.inner.get(&bind::lookup_named(&self.names, arg)?)
    }

    pub fn select<T: FromRow>(&self, arg: &NamedArgs) -> Result<Vec<T>> {
        self.inner.select(&bind::lookup_named(&self.names, arg)?)
    }
}

// === Capability ports ===

impl Preparer for DuckDbDatabase {
    type Stmt = DuckDbStatement;

    fn prepare(&self, query: &str) -> Result<DuckDbStatement> {
        self.prepare_statement(None, query)
    }
}

impl PreparerContext for DuckDbDatabase {
    type Stmt = DuckDbStatement;

    fn prepare_context(&self, ctx: &Context, query: &str) -> Result<DuckDbStatement> {
        self.prepare_statement(Some(ctx), query)
    }
}

impl Getter for DuckDbDatabase {
    fn get<T: FromRow>(&self, dest: &mut T, query: &str, args: &[Value]) -> Result<()> {
        *dest = T::from_row(&first_row(self.query_rows(None, query, args)?)?)?;
        Ok(())
    }
}

impl GetterContext for DuckDbDatabase {
    fn get_context<T: FromRow>(
        &self,
        ctx: &Context,
        dest: &mut T,
        query: &str,
        args: &[Value],
    ) -> Result<()> {
        *dest = T::from_row(&first_row(self.query_rows(Some(ctx), query, args)?)?)?;
        Ok(())
    }
}

impl Selecter for DuckDbDatabase {
    fn select<T: FromRow>(&self, dest: &mut Vec<T>, query: &str, args: &[Value]) -> Result<()> {
        dest.extend(self.query_rows(None, query, args)?.scan_all::<T>()?);
        Ok(())
    }
}

impl SelecterContext for DuckDbDatabase {
    fn select_context<T: FromRow>(
        &self,
        ctx: &Context,
        dest: &mut Vec<T>,
        query: &str,
        args: &[Value],
    ) -> Result<()> {
        dest.extend(self.query_rows(Some(ctx), query, args)?.scan_all::<T>()?);
        Ok(())
    }
}

impl Queryer for DuckDbDatabase {
    fn query(&self, query: &str, args: &[Value]) -> Result<Rows> {
        self.query_rows(None, query, args)
    }
}

impl QueryerContext for DuckDbDatabase {
    fn query_context(&self, ctx: &Context, query: &str, args: &[Value]) -> Result<Rows> {
        self.query_rows(Some(ctx), query, args)
    }
}

impl QueryRower for DuckDbDatabase {
    fn query_row(&self, query: &str, args: &[Value]) -> SingleRow {
        SingleRow::new(self.query_rows(None, query, args).and_then(first_row))
    }
}

impl QueryRowerContext for DuckDbDatabase {
    fn query_row_context(&self, ctx: &Context, query: &str, args: &[Value]) -> SingleRow {
        SingleRow::new(self.query_rows(Some(ctx), query, args).and_then(first_row))
    }
}

impl Execer for DuckDbDatabase {
    fn exec(&self, query: &str, args: &[Value]) -> Result<ExecResult> {
        self.exec_rows(None, query, args)
    }
}

impl ExecerContext for DuckDbDatabase {
    fn exec_context(&self, ctx: &Context, query: &str, args: &[Value]) -> Result<ExecResult> {
        self.exec_rows(Some(ctx), query, args)
    }
}

impl MustExecer for DuckDbDatabase {
    fn must_exec(&self, query: &str, args: &[Value]) -> ExecResult {
        match self.exec_rows(None, query, args) {
            Ok(result) => result,
            Err(e) => panic!("{}", e),
        }
    }
}

impl MustExecerContext for DuckDbDatabase {
    fn must_exec_context(&self, ctx: &Context, query: &str, args: &[Value]) -> ExecResult {
        match self.exec_rows(Some(ctx), query, args) {
            Ok(result) => result,
            Err(e) => panic!("{}", e),
        }
    }
}

impl Rebinder for DuckDbDatabase {
    fn rebind(&self, query: &str) -> String {
        bind::rebind(self.bind_style, query)
    }
}

impl NamedPreparer for DuckDbDatabase {
    type NamedStmt = DuckDbNamedStatement;

    fn prepare_named(&self, query: &str) -> Result<DuckDbNamedStatement> {
        self.prepare_named_statement(None, query)
    }
}

impl NamedPreparerContext for DuckDbDatabase {
    type NamedStmt = DuckDbNamedStatement;

    fn prepare_named_context(&self, ctx: &Context, query: &str) -> Result<DuckDbNamedStatement> {
        self.prepare_named_statement(Some(ctx), query)
    }
}

impl NamedQueryer for DuckDbDatabase {
    fn named_query(&self, query: &str, arg: &NamedArgs) -> Result<Rows> {
        self.named_rows(None, query, arg)
    }
}

impl NamedQueryerContext for DuckDbDatabase {
    fn named_query_context(&self, ctx: &Context, query: &str, arg: &NamedArgs) -> Result<Rows> {
        self.named_rows(Some(ctx), query, arg)
    }
}

impl NamedExecer for DuckDbDatabase {
    fn named_exec(&self, query: &str, arg: &NamedArgs) -> Result<ExecResult> {
        self.named_exec_rows(None, query, arg)
    }
}

impl NamedExecerContext for DuckDbDatabase {
    fn named_exec_context(
        &self,
        ctx: &Context,
        query: &str,
        arg: &NamedArgs,
    ) -> Result<ExecResult> {
        self.named_exec_rows(Some(ctx), query, arg)
    }
}

impl NamedBinder for DuckDbDatabase {
    fn bind_named(&self, query: &str, arg: &NamedArgs) -> Result<(String, Vec<Value>)> {
        bind::bind_named(query, self.bind_style, arg)
    }
}
