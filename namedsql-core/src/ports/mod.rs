//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The adapter
//! depends only on these traits, not on concrete implementations.

mod capability;
mod source;

pub use capability::*;
pub use source::QuerySource;
