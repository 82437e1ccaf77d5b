//! `LifeExecutor` Module
//!
//! Provides the `LifeExecutor` trait that abstracts statement execution, plus the
//! `SchemaIntrospector` used to discover table columns.
//!
//! Records never talk to a driver directly. Every statement is rendered by
//! sea-query for the configured [`Backend`] and handed to an executor as SQL text
//! plus bound values, so any driver (or a mock) can sit behind the trait.

use crate::query::column::ColumnMap;
use crate::value::Row;
use sea_query::{MysqlQueryBuilder, PostgresQueryBuilder, QueryBuilder, SqliteQueryBuilder, Value, Values};
use serde::Deserialize;
use std::fmt;

/// `LifeExecutor` error type
#[derive(Debug, Clone, PartialEq)]
pub enum LifeError {
    /// Query execution error reported by the driver
    QueryError(String),
    /// Row parsing/conversion error
    ParseError(String),
    /// Other execution errors
    Other(String),
}

impl fmt::Display for LifeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifeError::QueryError(s) => {
                write!(f, "Query error: {s}")
            }
            LifeError::ParseError(s) => {
                write!(f, "Parse error: {s}")
            }
            LifeError::Other(s) => {
                write!(f, "Execution error: {s}")
            }
        }
    }
}

impl std::error::Error for LifeError {}

/// Outcome of a statement that does not return rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecResult {
    /// Number of rows inserted, updated or deleted
    pub rows_affected: u64,
    /// Identity generated by the backend for an INSERT, when the driver reports one
    pub last_insert_id: Option<Value>,
}

impl ExecResult {
    pub fn new(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }

    pub fn with_insert_id(rows_affected: u64, id: impl Into<Value>) -> Self {
        Self {
            rows_affected,
            last_insert_id: Some(id.into()),
        }
    }
}

/// Trait for executing database operations
///
/// This trait abstracts database execution, allowing different implementations
/// (direct client, pooled connection, test double, etc.) to be used interchangeably.
/// Implementations must be shareable across threads because a single executor is
/// held by the model registry and used by every record created from it.
pub trait LifeExecutor: Send + Sync {
    /// Execute a query and return every row it produced
    ///
    /// # Arguments
    ///
    /// * `sql` - SQL text rendered for the executor's backend
    /// * `values` - Values bound to the placeholders in `sql`, in order
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the query execution fails.
    fn query_all(&self, sql: &str, values: &Values) -> Result<Vec<Row>, LifeError>;

    /// Execute a statement that does not return rows (INSERT without RETURNING, UPDATE, DELETE)
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the statement execution fails.
    fn execute(&self, sql: &str, values: &Values) -> Result<ExecResult, LifeError>;

    /// Execute a query and return the first row, if any
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the query execution fails.
    fn query_one(&self, sql: &str, values: &Values) -> Result<Option<Row>, LifeError> {
        Ok(self.query_all(sql, values)?.into_iter().next())
    }
}

/// Schema introspection collaborator
///
/// Used once per model (per cache lifetime) to learn the physical columns of a table.
pub trait SchemaIntrospector: Send + Sync {
    /// List the columns of `table`, in table order
    ///
    /// # Errors
    ///
    /// Returns `LifeError` if the catalogue query fails.
    fn list_columns(&self, table: &str) -> Result<ColumnMap, LifeError>;
}

/// SQL dialect used to render statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Postgres,
    Mysql,
    Sqlite,
}

impl Backend {
    /// The sea-query builder rendering this dialect
    pub fn query_builder(self) -> &'static dyn QueryBuilder {
        match self {
            Backend::Postgres => &PostgresQueryBuilder,
            Backend::Mysql => &MysqlQueryBuilder,
            Backend::Sqlite => &SqliteQueryBuilder,
        }
    }

    /// Whether INSERT can report the generated identity through `RETURNING`
    pub fn supports_returning(self) -> bool {
        matches!(self, Backend::Postgres | Backend::Sqlite)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Postgres => "postgres",
            Backend::Mysql => "mysql",
            Backend::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}
