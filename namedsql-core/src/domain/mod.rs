//! Core domain types
//!
//! Pure data structures and text transforms - no database I/O here.

pub mod bind;
mod context;
pub mod result;
mod row;
mod store;
mod value;

pub use bind::BindStyle;
pub use context::Context;
pub use row::{ExecResult, FromRow, FromValue, Row, Rows, SingleRow};
pub use store::QueryStore;
pub use value::{NamedArgs, Value};
