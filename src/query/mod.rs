//! Deferred query building.
//!
//! # Architecture
//!
//! - **Call**: the closed vocabulary of deferred builder calls (`QueryCall`)
//! - **Condition**: `where` / `having` predicate and group assembly
//! - **Builder**: `PendingQuery`, replaying queued calls onto sea-query statements
//! - **Column**: column metadata and the shared column cache

pub mod builder;
pub mod call;
pub mod column;
pub mod condition;

pub use builder::{PendingQuery, ReplayTarget, StatementKind};
pub use call::{CallKind, Direction, JoinKind, Logic, Op, Operand, QueryCall};
pub use column::{ColumnCache, ColumnDefinition, ColumnMap};
