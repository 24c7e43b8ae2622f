//! Run command - execute a named query against the database

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use namedsql_core::adapters::duckdb::DuckDbDatabase;
use namedsql_core::ports::{Execer, Queryer};
use namedsql_core::{ExecResult, NamedArgs, NamedSql, Rows, Value};

use super::{get_config, load_store};
use crate::output::{self, OutputFormat};

pub struct RunOptions<'a> {
    pub name: &'a str,
    pub args: &'a [String],
    pub named: &'a [String],
    pub exec: bool,
    pub db: Option<&'a Path>,
    pub files: &'a [PathBuf],
    pub format: OutputFormat,
}

/// Rows materialized for output
#[derive(Serialize)]
struct QueryOutput {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    row_count: usize,
}

impl From<Rows> for QueryOutput {
    fn from(rows: Rows) -> Self {
        let columns = rows.columns().to_vec();
        let rows: Vec<Vec<Value>> = rows.map(|r| r.values().to_vec()).collect();
        Self {
            columns,
            row_count: rows.len(),
            rows,
        }
    }
}

pub fn run(opts: RunOptions) -> Result<()> {
    let mut config = get_config()?;
    if let Some(db) = opts.db {
        config.database = Some(config.resolve(db));
    }

    let queries = NamedSql::new(load_store(&config, opts.files)?);
    let db = config.open_database().context("Failed to open database")?;

    if !opts.named.is_empty() {
        if !opts.args.is_empty() {
            anyhow::bail!("Positional arguments cannot be combined with --named");
        }
        let arg = parse_named(opts.named)?;
        return if opts.exec {
            print_exec(queries.named_exec(&db, opts.name, &arg)?, opts.format)
        } else {
            print_rows(queries.named_query(&db, opts.name, &arg)?, opts.format)
        };
    }

    let args: Vec<Value> = opts.args.iter().map(|a| parse_arg(a)).collect();

    if args.iter().any(Value::is_list) {
        let (sql, args) = queries.expand_in(opts.name, &args)?;
        tracing::debug!(query = opts.name, sql = %sql, "expanded IN arguments");
        return if opts.exec {
            print_exec(Execer::exec(&db, &sql, &args)?, opts.format)
        } else {
            print_rows(Queryer::query(&db, &sql, &args)?, opts.format)
        };
    }

    if opts.exec {
        print_exec(queries.exec(&db, opts.name, &args)?, opts.format)
    } else {
        print_rows(queries.query(&db, opts.name, &args)?, opts.format)
    }
}

/// Parse a positional argument as a JSON scalar or list, else take it as text
fn parse_arg(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json @ serde_json::Value::Object(_)) => Value::Text(json.to_string()),
        Ok(json) => Value::from_json(&json),
        Err(_) => Value::Text(raw.to_string()),
    }
}

fn parse_named(pairs: &[String]) -> Result<NamedArgs> {
    pairs
        .iter()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("Expected KEY=VALUE, got '{}'", pair))?;
            Ok((key.trim().to_string(), parse_arg(value)))
        })
        .collect()
}

fn print_exec(result: ExecResult, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return output::json(result);
    }
    output::success(&format!("{} row(s) affected", result.rows_affected));
    Ok(())
}

fn print_rows(rows: Rows, format: OutputFormat) -> Result<()> {
    let result = QueryOutput::from(rows);

    match format {
        OutputFormat::Json => output::json(&result)?,
        OutputFormat::Csv => {
            println!("{}", result.columns.join(","));
            for row in &result.rows {
                let values: Vec<String> = row.iter().map(output::value_to_csv).collect();
                println!("{}", values.join(","));
            }
        }
        OutputFormat::Table => {
            let mut table = output::create_table();
            table.set_header(&result.columns);

            for row in &result.rows {
                let values: Vec<String> = row.iter().map(output::value_to_string).collect();
                table.add_row(values);
            }

            println!("{}", table);
            println!();
            println!("{} row(s) returned", result.row_count);
        }
    }

    Ok(())
}
