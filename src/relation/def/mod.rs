//! Relation definition module for storing relationship metadata.
//!
//! This module provides the normalized `RelationDef`, the `RelationType` enum and
//! the `RelationOptions` used to override defaults at declaration time.

pub mod struct_def;
pub mod types;

// Re-export public types
#[doc(inline)]
pub use struct_def::{RelationDef, RelationOptions};
#[doc(inline)]
pub use types::RelationType;
