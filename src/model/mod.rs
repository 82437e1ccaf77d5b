//! Model declarations and the registry that holds them.

pub mod def;
pub mod filter;
pub mod registry;

pub use def::{ModelDecl, ModelDef, TimestampColumn, TimestampFormat};
pub use filter::{Filter, FilterContext, FilterSet};
pub use registry::{ModelRegistry, ModelRegistryBuilder};
