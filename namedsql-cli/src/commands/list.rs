//! List command - names and first SQL line of every query

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use super::{get_config, load_store};
use crate::output;

#[derive(Serialize)]
struct QueryEntry<'a> {
    name: &'a str,
    sql: &'a str,
}

pub fn run(files: &[PathBuf], json: bool) -> Result<()> {
    let config = get_config()?;
    let store = load_store(&config, files)?;

    let entries: Vec<QueryEntry> = store
        .names()
        .into_iter()
        .map(|name| QueryEntry {
            name,
            sql: store.raw(name).unwrap_or_default(),
        })
        .collect();

    if json {
        return output::json(&entries);
    }

    if entries.is_empty() {
        output::info("No queries found");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Name", "SQL"]);
    for entry in &entries {
        table.add_row(vec![entry.name, output::first_line(entry.sql)]);
    }
    println!("{}", table);
    println!();
    println!("{} quer{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });

    Ok(())
}
