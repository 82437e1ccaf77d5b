//! Relation module for record relationships.
//!
//! This module provides support for declaring and traversing record relationships:
//! - belongs_to: Many-to-one relationship, foreign key on this table
//! - has_one: One-to-one relationship, foreign key on the target table
//! - has_many: One-to-many relationship, foreign key on the target table
//! - has_many through: Many-to-many relationship via a join table
//!
//! # Architecture
//!
//! - **Def**: normalized relation declarations (`RelationDef`, `RelationType`)
//! - **Lazy**: on-access resolution of one-to-one relations, scoped queries for
//!   to-many relations
//! - **Eager**: `with()` join paths that load one-to-one relations in the same select
//! - **Through**: `has` / `add` / `remove` on join tables

pub mod def;
#[doc(inline)]
pub use def::{RelationDef, RelationOptions, RelationType};

pub mod eager;
pub mod lazy;
pub mod through;
