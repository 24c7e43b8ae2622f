//! Query source port - name to SQL lookup

use std::sync::Arc;

use crate::domain::result::Result;
use crate::domain::QueryStore;

/// Anything that can resolve a query name to its SQL text
///
/// Lookups must be pure reads: exact, case-sensitive, and failing with
/// `Error::QueryNotFound` when the name is absent.
pub trait QuerySource {
    fn raw(&self, name: &str) -> Result<&str>;
}

impl QuerySource for QueryStore {
    fn raw(&self, name: &str) -> Result<&str> {
        QueryStore::raw(self, name)
    }
}

impl<S: QuerySource + ?Sized> QuerySource for &S {
    fn raw(&self, name: &str) -> Result<&str> {
        (**self).raw(name)
    }
}

impl<S: QuerySource + ?Sized> QuerySource for Arc<S> {
    fn raw(&self, name: &str) -> Result<&str> {
        (**self).raw(name)
    }
}

impl<S: QuerySource + ?Sized> QuerySource for Box<S> {
    fn raw(&self, name: &str) -> Result<&str> {
        (**self).raw(name)
    }
}
