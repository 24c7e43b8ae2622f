//! Integration tests for namedsql-core
//!
//! Named queries are resolved from a real query file and run against a
//! real DuckDB database.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::time::Duration;

use serde::Deserialize;
use tempfile::TempDir;

use namedsql_core::adapters::duckdb::DuckDbDatabase;
use namedsql_core::config::Config;
use namedsql_core::{
    sql_args, BindStyle, Context, Error, NamedArgs, NamedSql, NamedSqlContext, QueryStore, Row,
    Value,
};

const QUERIES: &str = "\
-- Queries over the numbers table

-- name: create-numbers
CREATE TABLE numbers (nr INTEGER, label VARCHAR)

-- name: insert
INSERT INTO numbers (nr, label) VALUES (?, ?)

-- name: insert-named
INSERT INTO numbers (nr, label) VALUES (:nr, :label)

-- name: select
SELECT nr, label FROM numbers WHERE nr = ?

-- name: select-in
SELECT nr FROM numbers WHERE nr IN (?) ORDER BY nr

-- name: select-named
SELECT nr, label FROM numbers WHERE nr >= :low ORDER BY nr

-- name: count
SELECT count(*) FROM numbers

-- name: insert-missing-table
INSERT INTO missing_table VALUES (?)
";

// ============================================================================
// Test Helpers
// ============================================================================

fn create_queries() -> NamedSql {
    NamedSql::new(QueryStore::load_from_str(QUERIES).expect("Failed to parse queries"))
}

/// In-memory database with the numbers table and three rows
fn create_test_db(queries: &NamedSql) -> DuckDbDatabase {
    let db = DuckDbDatabase::open_in_memory().expect("Failed to open database");
    queries.exec(&db, "create-numbers", &[]).unwrap();
    for (nr, label) in [(1, "one"), (2, "two"), (3, "three")] {
        queries.exec(&db, "insert", &sql_args![nr, label]).unwrap();
    }
    db
}

fn count(queries: &NamedSql, db: &DuckDbDatabase) -> i64 {
    let mut n = 0i64;
    queries.get(db, &mut n, "count", &[]).unwrap();
    n
}

// ============================================================================
// Positional Operations
// ============================================================================

#[test]
fn test_exec_then_get() {
    let queries = create_queries();
    let db = create_test_db(&queries);

    let result = queries.exec(&db, "insert", &sql_args![4, "four"]).unwrap();
    assert_eq!(result.rows_affected, 1);

    let mut found: (i64, String) = (0, String::new());
    queries.get(&db, &mut found, "select", &sql_args![4]).unwrap();
    assert_eq!(found, (4, "four".to_string()));
}

#[test]
fn test_get_without_rows() {
    let queries = create_queries();
    let db = create_test_db(&queries);

    let mut found = 0i64;
    let err = queries.get(&db, &mut found, "select", &sql_args![99]).unwrap_err();
    assert!(matches!(err, Error::NoRows));
}

#[test]
fn test_select_into_structs() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Number {
        nr: i64,
        label: String,
    }

    let queries = create_queries();
    let db = create_test_db(&queries);

    let mut rows: Vec<Row> = Vec::new();
    queries
        .select(&db, &mut rows, "select", &sql_args![2])
        .unwrap();
    let numbers: Vec<Number> = rows.iter().map(|r| r.decode().unwrap()).collect();
    assert_eq!(
        numbers,
        vec![Number {
            nr: 2,
            label: "two".to_string()
        }]
    );
}

#[test]
fn test_query_and_query_row() {
    let queries = create_queries();
    let db = create_test_db(&queries);

    let rows = queries.query(&db, "select", &sql_args![3]).unwrap();
    assert_eq!(rows.columns(), &["nr".to_string(), "label".to_string()]);
    assert_eq!(rows.count(), 1);

    let label: (i64, String) = queries
        .query_row(&db, "select", &sql_args![1])
        .unwrap()
        .scan()
        .unwrap();
    assert_eq!(label.1, "one");
}

#[test]
fn test_prepared_statement_runs_repeatedly() {
    let queries = create_queries();
    let db = create_test_db(&queries);

    let stmt = queries.prepare(&db, "insert").unwrap();
    for nr in 10..15 {
        stmt.exec(&sql_args![nr, format!("n{}", nr)]).unwrap();
    }
    assert_eq!(count(&queries, &db), 8);
}

#[test]
fn test_prepare_reports_database_errors() {
    let queries = create_queries();
    let db = create_test_db(&queries);

    let err = queries.prepare(&db, "insert-missing-table").unwrap_err();
    assert!(matches!(err, Error::Database(_)));
}

// ============================================================================
// Unknown Names
// ============================================================================

#[test]
fn test_unknown_name_leaves_database_untouched() {
    let queries = create_queries();
    let db = create_test_db(&queries);

    let err = queries.exec(&db, "insert123", &sql_args![5, "five"]).unwrap_err();
    assert!(matches!(&err, Error::QueryNotFound(name) if name == "insert123"));
    assert_eq!(err.to_string(), "Query not found: insert123");
    assert_eq!(count(&queries, &db), 3);

    assert!(queries.prepare(&db, "nope").unwrap_err().is_not_found());
    assert!(queries
        .query_row(&db, "nope", &[])
        .unwrap_err()
        .is_not_found());
}

#[test]
#[should_panic(expected = "Query not found: insert123")]
fn test_must_exec_panics_on_unknown_name() {
    let queries = create_queries();
    let db = create_test_db(&queries);
    queries.must_exec(&db, "insert123", &sql_args![1, "x"]);
}

#[test]
#[should_panic(expected = "Database error")]
fn test_must_exec_panics_on_database_error() {
    let queries = create_queries();
    let db = create_test_db(&queries);
    queries.must_exec(&db, "insert-missing-table", &sql_args![1]);
}

#[test]
fn test_must_exec_succeeds() {
    let queries = create_queries();
    let db = create_test_db(&queries);
    let result = queries.must_exec(&db, "insert", &sql_args![7, "seven"]);
    assert_eq!(result.rows_affected, 1);
}

// ============================================================================
// Contexts
// ============================================================================

#[test]
fn test_context_variants_run_with_live_context() {
    let queries = create_queries();
    let db = create_test_db(&queries);
    let ctx = Context::with_timeout(Duration::from_secs(30));

    queries
        .exec_context(&ctx, &db, "insert", &sql_args![4, "four"])
        .unwrap();
    let mut numbers: Vec<i64> = Vec::new();
    queries
        .select_context(&ctx, &db, &mut numbers, "select-in", &sql_args![4])
        .unwrap();
    assert_eq!(numbers, vec![4]);
}

#[test]
fn test_cancelled_context_is_rejected() {
    let queries = create_queries();
    let db = create_test_db(&queries);
    let ctx = Context::background();
    ctx.cancel();

    let err = queries
        .exec_context(&ctx, &db, "insert", &sql_args![4, "four"])
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));

    let err = queries
        .query_context(&ctx, &db, "select", &sql_args![1])
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));

    assert_eq!(count(&queries, &db), 3);
}

#[test]
fn test_unknown_name_wins_over_cancelled_context() {
    let queries = create_queries();
    let db = create_test_db(&queries);
    let ctx = Context::background();
    ctx.cancel();

    let err = queries
        .exec_context(&ctx, &db, "insert123", &[])
        .unwrap_err();
    assert!(err.is_not_found());
}

// ============================================================================
// Named Parameters
// ============================================================================

#[test]
fn test_named_exec_and_query() {
    let queries = create_queries();
    let db = create_test_db(&queries);

    let arg = NamedArgs::new().with("nr", 5).with("label", "five");
    queries.named_exec(&db, "insert-named", &arg).unwrap();

    let rows = queries
        .named_query(&db, "select-named", &NamedArgs::new().with("low", 3))
        .unwrap();
    let numbers: Vec<(i64, String)> = rows.scan_all().unwrap();
    assert_eq!(
        numbers,
        vec![(3, "three".to_string()), (5, "five".to_string())]
    );
}

#[test]
fn test_named_args_from_struct() {
    #[derive(serde::Serialize)]
    struct NewNumber<'a> {
        nr: i64,
        label: &'a str,
    }

    let queries = create_queries();
    let db = create_test_db(&queries);

    let arg = NamedArgs::from_serialize(&NewNumber {
        nr: 8,
        label: "eight",
    })
    .unwrap();
    queries.named_exec(&db, "insert-named", &arg).unwrap();
    assert_eq!(count(&queries, &db), 4);
}

#[test]
fn test_named_exec_missing_argument() {
    let queries = create_queries();
    let db = create_test_db(&queries);

    let err = queries
        .named_exec(&db, "insert-named", &NamedArgs::new().with("nr", 5))
        .unwrap_err();
    assert!(matches!(err, Error::Bind(msg) if msg.contains("label")));
    assert_eq!(count(&queries, &db), 3);
}

#[test]
fn test_prepared_named_statement() {
    let queries = create_queries();
    let db = create_test_db(&queries);

    let stmt = queries.prepare_named(&db, "insert-named").unwrap();
    assert_eq!(stmt.names(), &["nr".to_string(), "label".to_string()]);
    stmt.exec(&NamedArgs::new().with("nr", 20).with("label", "twenty"))
        .unwrap();
    assert_eq!(count(&queries, &db), 4);
}

#[test]
fn test_bind_named_and_rebind_follow_bind_style() {
    let queries = create_queries();
    let db = DuckDbDatabase::open_in_memory()
        .unwrap()
        .with_bind_style(BindStyle::Dollar);

    assert_eq!(
        queries.rebind(&db, "insert").unwrap(),
        "INSERT INTO numbers (nr, label) VALUES ($1, $2)"
    );

    let (sql, args) = queries
        .bind_named(
            &db,
            "insert-named",
            &NamedArgs::new().with("nr", 1).with("label", "one"),
        )
        .unwrap();
    assert_eq!(sql, "INSERT INTO numbers (nr, label) VALUES ($1, $2)");
    assert_eq!(args, sql_args![1, "one"]);
}

// ============================================================================
// IN Expansion
// ============================================================================

#[test]
fn test_expand_in_then_query() {
    let queries = create_queries();
    let db = create_test_db(&queries);

    let (sql, args) = queries.expand_in("select-in", &sql_args![vec![1, 3]]).unwrap();
    assert_eq!(sql, "SELECT nr FROM numbers WHERE nr IN (?, ?) ORDER BY nr");

    let numbers: Vec<i64> = db_query(&db, &sql, &args);
    assert_eq!(numbers, vec![1, 3]);
}

fn db_query(db: &DuckDbDatabase, sql: &str, args: &[Value]) -> Vec<i64> {
    use namedsql_core::ports::Queryer;
    db.query(sql, args).unwrap().scan_all().unwrap()
}

#[test]
fn test_expand_in_errors() {
    let queries = create_queries();

    let err = queries.expand_in("missing", &sql_args![vec![1]]).unwrap_err();
    assert!(err.is_not_found());

    let err = queries
        .expand_in("select-in", &[Value::List(vec![])])
        .unwrap_err();
    assert!(matches!(err, Error::Expansion(_)));
}

#[test]
fn test_apostrophe_in_comment_does_not_hide_bindvars() {
    let queries = create_queries();
    let db = create_test_db(&queries);
    let commented = NamedSql::new(
        QueryStore::load_from_str(
            "\
-- name: select-in-commented
-- don't return archived numbers
SELECT nr FROM numbers /* it's sorted */ WHERE nr IN (?) ORDER BY nr

-- name: select-named-commented
SELECT nr FROM numbers -- the caller's lower bound
WHERE nr >= :low ORDER BY nr
",
        )
        .unwrap(),
    );

    let (sql, args) = commented
        .expand_in("select-in-commented", &sql_args![vec![2, 3]])
        .unwrap();
    assert!(sql.contains("IN (?, ?)"));
    assert_eq!(db_query(&db, &sql, &args), vec![2, 3]);

    let rows = commented
        .named_query(&db, "select-named-commented", &NamedArgs::new().with("low", 2))
        .unwrap();
    let numbers: Vec<i64> = rows.scan_all().unwrap();
    assert_eq!(numbers, vec![2, 3]);
}

// ============================================================================
// On-disk Database and Config
// ============================================================================

#[test]
fn test_context_from_config() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("numbers.sql"), QUERIES).unwrap();
    let config = Config {
        dir: temp_dir.path().to_path_buf(),
        database: Some(temp_dir.path().join("numbers.duckdb")),
        queries: vec![temp_dir.path().join("numbers.sql")],
        bind_style: BindStyle::Question,
    };

    {
        let ctx = NamedSqlContext::from_config(config.clone()).unwrap();
        ctx.queries.exec(&ctx.db, "create-numbers", &[]).unwrap();
        ctx.queries
            .exec(&ctx.db, "insert", &sql_args![42, "answer"])
            .unwrap();
    }

    // Reopen: data persisted to the file
    let ctx = NamedSqlContext::from_config(config).unwrap();
    let label: String = ctx
        .queries
        .query_row(&ctx.db, "select", &sql_args![42])
        .unwrap()
        .into_row()
        .unwrap()
        .try_get(1)
        .unwrap();
    assert_eq!(label, "answer");
    assert_eq!(ctx.db.path(), Some(temp_dir.path().join("numbers.duckdb").as_path()));
}
