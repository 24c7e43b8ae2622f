//! Query store - named SQL loaded from `-- name:` tagged sources
//!
//! ```sql
//! -- name: create-users
//! CREATE TABLE users (id INTEGER, name VARCHAR)
//!
//! -- name: find-user
//! SELECT * FROM users WHERE id = ?
//! ```

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use super::result::{Error, Result};

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"^\s*--\s*name:\s*(\S+)").expect("tag pattern is valid"))
}

/// Immutable name -> SQL mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStore {
    queries: HashMap<String, String>,
}

/// Query being accumulated while scanning
struct Pending {
    name: String,
    line: usize,
    body: Vec<String>,
}

impl QueryStore {
    /// Parse a query source held in memory
    pub fn load_from_str(source: &str) -> Result<Self> {
        let mut queries = HashMap::new();
        let mut current: Option<Pending> = None;

        for (idx, line) in source.lines().enumerate() {
            if let Some(caps) = tag_pattern().captures(line) {
                if let Some(done) = current.take() {
                    Self::finish(&mut queries, done)?;
                }
                current = Some(Pending {
                    name: caps[1].to_string(),
                    line: idx + 1,
                    body: Vec::new(),
                });
            } else if let Some(pending) = current.as_mut() {
                pending.body.push(line.to_string());
            }
            // Lines before the first tag are a preamble and are dropped
        }

        if let Some(done) = current.take() {
            Self::finish(&mut queries, done)?;
        }

        tracing::debug!(count = queries.len(), "loaded named queries");
        Ok(Self { queries })
    }

    /// Parse a query source from any reader
    pub fn load_from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut source = String::new();
        reader.read_to_string(&mut source)?;
        Self::load_from_str(&source)
    }

    /// Parse a query file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "reading query file");
        Self::load_from_str(&source)
    }

    fn finish(queries: &mut HashMap<String, String>, pending: Pending) -> Result<()> {
        let sql = pending.body.join("\n").trim().to_string();
        if sql.is_empty() {
            return Err(Error::Parse {
                line: pending.line,
                message: format!("query '{}' has no SQL text", pending.name),
            });
        }
        if queries.contains_key(&pending.name) {
            return Err(Error::DuplicateQuery(pending.name));
        }
        queries.insert(pending.name, sql);
        Ok(())
    }

    /// Combine stores; on name collisions the later store wins
    pub fn merge<I: IntoIterator<Item = QueryStore>>(stores: I) -> Self {
        let mut queries = HashMap::new();
        for store in stores {
            queries.extend(store.queries);
        }
        Self { queries }
    }

    /// SQL text for `name` (exact, case-sensitive match)
    pub fn raw(&self, name: &str) -> Result<&str> {
        self.queries
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| Error::query_not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.queries.contains_key(name)
    }

    /// Query names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.queries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn query_map(&self) -> &HashMap<String, String> {
        &self.queries
    }
}
