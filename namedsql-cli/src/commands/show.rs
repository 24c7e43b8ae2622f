//! Show command - print the SQL of one query

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use namedsql_core::adapters::duckdb::DuckDbDatabase;
use namedsql_core::NamedSql;

use super::{get_config, load_store};
use crate::output;

#[derive(Serialize)]
struct ShowOutput<'a> {
    name: &'a str,
    sql: &'a str,
}

pub fn run(name: &str, files: &[PathBuf], rebind: bool, json: bool) -> Result<()> {
    let config = get_config()?;
    let queries = NamedSql::new(load_store(&config, files)?);

    let sql = if rebind {
        // Rebinding needs only the bind style, not the configured database
        let db = DuckDbDatabase::open_in_memory()?.with_bind_style(config.bind_style);
        queries.rebind(&db, name)?
    } else {
        queries.source().raw(name)?.to_string()
    };

    if json {
        return output::json(ShowOutput { name, sql: &sql });
    }

    println!("{}", sql);
    Ok(())
}
