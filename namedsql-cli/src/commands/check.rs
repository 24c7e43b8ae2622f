//! Check command - syntax-check every query without a database

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use namedsql_core::domain::bind::{self, BindStyle};
use namedsql_core::validate_sql_syntax;

use super::{get_config, load_store};
use crate::output;

#[derive(Serialize)]
struct CheckEntry<'a> {
    name: &'a str,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(files: &[PathBuf], json: bool) -> Result<()> {
    let config = get_config()?;
    let store = load_store(&config, files)?;

    let entries: Vec<CheckEntry> = store
        .names()
        .into_iter()
        .map(|name| {
            let raw = store.raw(name).unwrap_or_default();
            // `:name` parameters are not SQL; compile them to bindvars first
            let (sql, _) = bind::compile_named(raw, BindStyle::Question);
            let error = validate_sql_syntax(&sql).err().map(|e| e.to_string());
            CheckEntry {
                name,
                valid: error.is_none(),
                error,
            }
        })
        .collect();

    let failed = entries.iter().filter(|e| !e.valid).count();

    if json {
        output::json(&entries)?;
    } else {
        for entry in &entries {
            match &entry.error {
                None => println!("{} {}", "ok".green(), entry.name),
                Some(e) => println!("{} {}: {}", "FAIL".red(), entry.name, e),
            }
        }
        println!();
        if failed == 0 {
            output::success(&format!("All {} queries passed", entries.len()));
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} queries failed the syntax check", failed, entries.len());
    }
    Ok(())
}
