//! Column metadata.
//!
//! # Structure
//!
//! - `definition`: what the introspector reports about one column
//! - `cache`: shared per-model cache of column maps

pub mod cache;
pub mod definition;

// Re-export public types
pub use cache::{ColumnCache, ColumnMap};
pub use definition::ColumnDefinition;
