//! # Lifeline
//!
//! Active-record runtime over sea-query: records that load, track, validate and
//! persist their own rows, with declared relations resolved lazily or eagerly.
//!
//! # Architecture
//!
//! - **Model**: declarations (`ModelDecl`) normalized into a shared `ModelRegistry`
//! - **Record**: one row plus its change tracking, deferred builder calls and
//!   terminal operations (`find`, `find_all`, `save`, `delete`, ...)
//! - **Relation**: `belongs_to` / `has_one` / `has_many` (optionally through a join
//!   table), `with()` eager loading, `has` / `add` / `remove`
//! - **Query**: the deferred call queue replayed onto sea-query statements
//! - **Executor**: the seam to whatever driver runs the SQL
//!
//! # Example
//!
//! ```no_run
//! use lifeline::{ModelDecl, ModelRegistry, RelationOptions};
//! # fn run(executor: std::sync::Arc<dyn lifeline::LifeExecutor>) -> Result<(), lifeline::OrmError> {
//! let registry = ModelRegistry::builder(executor)
//!     .model(ModelDecl::new("post").belongs_to("author", RelationOptions::new().model("user")))
//!     .model(ModelDecl::new("user"))
//!     .build()?;
//!
//! let mut post = registry.find_by_pk("post", 5)?;
//! post.set("title", "Hello")?.save(None)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod inflector;
pub mod model;
pub mod query;
pub mod record;
pub mod relation;
pub mod test_helpers;
pub mod validation;
pub mod value;

#[cfg(feature = "tracing")]
mod tracing_helpers;

pub use config::OrmConfig;
pub use error::OrmError;
pub use executor::{Backend, ExecResult, LifeError, LifeExecutor, SchemaIntrospector};
pub use inflector::{EnglishInflector, Inflector};
pub use model::{Filter, ModelDecl, ModelDef, ModelRegistry, ModelRegistryBuilder, TimestampFormat};
pub use query::{ColumnDefinition, ColumnMap, Direction, JoinKind, Op, Operand};
pub use record::{Expected, Field, MapValue, Record, RecordSnapshot, ResultSet};
pub use relation::{RelationDef, RelationOptions, RelationType};
pub use validation::{Rule, Validation, ValidationErrors};
pub use value::Row;
