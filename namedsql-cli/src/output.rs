//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use serde::Serialize;

use namedsql_core::{OperationResult, Value};

/// Row output format for `nsql run`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Print a successful `OperationResult` envelope
pub fn json<T: Serialize>(data: T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&OperationResult::ok(data))?);
    Ok(())
}

/// Table cell text; NULL is spelled out
pub fn value_to_string(v: &Value) -> String {
    v.to_string()
}

/// CSV field text; NULL is empty and fields with separators are quoted
pub fn value_to_csv(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Text(s) => csv_field(s),
        other => csv_field(&other.to_string()),
    }
}

fn csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// First non-empty line of a SQL body, for listings
pub fn first_line(sql: &str) -> &str {
    sql.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_to_csv_quotes() {
        assert_eq!(value_to_csv(&Value::Null), "");
        assert_eq!(value_to_csv(&Value::Text("a,b".into())), "\"a,b\"");
        assert_eq!(value_to_csv(&Value::Text("say \"hi\"".into())), "\"say \"\"hi\"\"\"");
        assert_eq!(value_to_csv(&Value::Int(3)), "3");
        assert_eq!(
            value_to_csv(&Value::List(vec![Value::Int(1), Value::Int(2)])),
            "\"[1, 2]\""
        );
    }

    #[test]
    fn test_value_to_csv_escapes_list_text() {
        let list = Value::List(vec![
            Value::Text("say \"hi\"".into()),
            Value::Text("two\nlines".into()),
        ]);
        assert_eq!(value_to_csv(&list), "\"[say \"\"hi\"\", two\nlines]\"");
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("\n  SELECT *\n  FROM t"), "SELECT *");
        assert_eq!(first_line(""), "");
    }
}
