//! Test doubles for driving records without a database.
//!
//! [`MockExecutor`] records every statement it is given and answers from queues
//! filled by the test, first in, first out. [`StaticIntrospector`] serves fixed
//! column maps and counts how often it was asked.
//!
//! # Example
//!
//! ```
//! use lifeline::test_helpers::{row, MockExecutor};
//! use sea_query::Value;
//!
//! let executor = MockExecutor::new();
//! executor.push_rows(vec![row([("id", Value::Int(Some(1)))])]);
//! ```

use crate::executor::{ExecResult, LifeError, LifeExecutor, SchemaIntrospector};
use crate::query::ColumnMap;
use crate::value::Row;
use sea_query::{Value, Values};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build a result row from `(column, value)` pairs
pub fn row<I, K>(pairs: I) -> Row
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(column, value)| (column.into(), value)).collect()
}

/// One statement handed to the executor
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub sql: String,
    pub values: Values,
}

/// Executor answering from queued results
///
/// An empty row queue answers queries with no rows; an empty exec queue
/// answers statements with zero affected rows and no insert id.
#[derive(Debug, Default)]
pub struct MockExecutor {
    rows: Mutex<VecDeque<Result<Vec<Row>, LifeError>>>,
    results: Mutex<VecDeque<Result<ExecResult, LifeError>>>,
    executed: Mutex<Vec<ExecutedStatement>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the rows of the next query
    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        lock(&self.rows).push_back(Ok(rows));
        self
    }

    /// Make the next query fail
    pub fn push_query_error(&self, err: LifeError) -> &Self {
        lock(&self.rows).push_back(Err(err));
        self
    }

    /// Queue the result of the next non-query statement
    pub fn push_exec(&self, result: ExecResult) -> &Self {
        lock(&self.results).push_back(Ok(result));
        self
    }

    pub fn push_exec_error(&self, err: LifeError) -> &Self {
        lock(&self.results).push_back(Err(err));
        self
    }

    /// Every statement executed so far, queries and non-queries, in order
    pub fn executed(&self) -> Vec<ExecutedStatement> {
        lock(&self.executed).clone()
    }

    /// SQL text of every statement executed so far
    pub fn statements(&self) -> Vec<String> {
        lock(&self.executed).iter().map(|stmt| stmt.sql.clone()).collect()
    }

    /// Forget executed statements; queued results are kept
    pub fn clear_statements(&self) {
        lock(&self.executed).clear();
    }

    fn record(&self, sql: &str, values: &Values) {
        log::debug!("MockExecutor: {}", sql);
        lock(&self.executed).push(ExecutedStatement {
            sql: sql.to_string(),
            values: values.clone(),
        });
    }
}

impl LifeExecutor for MockExecutor {
    fn query_all(&self, sql: &str, values: &Values) -> Result<Vec<Row>, LifeError> {
        self.record(sql, values);
        lock(&self.rows).pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn execute(&self, sql: &str, values: &Values) -> Result<ExecResult, LifeError> {
        self.record(sql, values);
        lock(&self.results)
            .pop_front()
            .unwrap_or_else(|| Ok(ExecResult::default()))
    }
}

/// Introspector serving fixed column maps by table name
#[derive(Debug, Default)]
pub struct StaticIntrospector {
    tables: HashMap<String, ColumnMap>,
    calls: AtomicUsize,
}

impl StaticIntrospector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, name: impl Into<String>, columns: ColumnMap) -> Self {
        self.tables.insert(name.into(), columns);
        self
    }

    /// How many times `list_columns` was called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SchemaIntrospector for StaticIntrospector {
    fn list_columns(&self, table: &str) -> Result<ColumnMap, LifeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| LifeError::QueryError(format!("relation \"{}\" does not exist", table)))
    }
}

/// Install a `tracing` subscriber writing to the test output
///
/// Safe to call more than once; only the first call installs anything.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::fmt;
    let _ = fmt().with_test_writer().with_max_level(tracing::Level::DEBUG).try_init();
}
