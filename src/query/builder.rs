//! Pending query state and statement assembly.
//!
//! `PendingQuery` holds the deferred calls of one record. A terminal operation asks
//! it for a concrete statement (`build_select`, `build_update`, `build_delete`);
//! every queued call is then replayed, in order, through [`ReplayTarget`], and the
//! names of the applied calls are remembered until the next reset.

use super::call::{column_ref, table_ref, CallKind, JoinKind, Logic, Op, Operand, QueryCall};
use super::condition::{predicate, ConditionBuilder};
use crate::error::OrmError;
use sea_query::{
    Alias, ColumnRef, Condition, ConditionalStatement, DeleteStatement, Expr, Order,
    OrderedStatement, Query, SelectStatement, SimpleExpr, UpdateStatement,
};
use std::collections::HashSet;
use std::fmt;

/// Concrete statement a terminal operation commits to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Update,
    Delete,
}

impl StatementKind {
    /// Whether calls of `kind` can be replayed onto this statement
    pub fn accepts(self, kind: CallKind) -> bool {
        match self {
            StatementKind::Select => true,
            StatementKind::Update | StatementKind::Delete => matches!(
                kind,
                CallKind::Where
                    | CallKind::WhereOpen
                    | CallKind::WhereClose
                    | CallKind::OrderBy
                    | CallKind::Limit
            ),
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatementKind::Select => "SELECT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
        })
    }
}

fn unsupported(statement: StatementKind, call: CallKind) -> OrmError {
    OrmError::invalid(format!(
        "{}() is not supported on {} statements",
        call.name(),
        statement
    ))
}

/// A `join()` waiting for its `on()` clauses
#[derive(Debug, Clone)]
pub struct PendingJoin {
    pub table: String,
    pub alias: Option<String>,
    pub kind: JoinKind,
    pub on: Vec<SimpleExpr>,
}

/// A statement deferred calls can be replayed onto
pub trait ReplayTarget {
    const KIND: StatementKind;

    fn add_where(&mut self, condition: SimpleExpr);

    fn add_order(&mut self, column: ColumnRef, order: Order);

    fn set_limit(&mut self, limit: u64);

    /// Calls only a SELECT understands
    fn apply_select(&mut self, call: &QueryCall) -> Result<(), OrmError> {
        Err(unsupported(Self::KIND, call.kind()))
    }

    fn add_join(&mut self, _join: PendingJoin) -> Result<(), OrmError> {
        Err(unsupported(Self::KIND, CallKind::Join))
    }

    fn add_having(&mut self, _condition: SimpleExpr) -> Result<(), OrmError> {
        Err(unsupported(Self::KIND, CallKind::Having))
    }
}

impl ReplayTarget for SelectStatement {
    const KIND: StatementKind = StatementKind::Select;

    fn add_where(&mut self, condition: SimpleExpr) {
        self.and_where(condition);
    }

    fn add_order(&mut self, column: ColumnRef, order: Order) {
        self.order_by(column, order);
    }

    fn set_limit(&mut self, limit: u64) {
        self.limit(limit);
    }

    fn apply_select(&mut self, call: &QueryCall) -> Result<(), OrmError> {
        match call {
            QueryCall::Distinct(true) => {
                self.distinct();
            }
            QueryCall::Distinct(false) => {}
            QueryCall::Select { column, alias: None } => {
                self.column(column_ref(column));
            }
            QueryCall::Select {
                column,
                alias: Some(alias),
            } => {
                self.expr_as(Expr::col(column_ref(column)), Alias::new(alias.as_str()));
            }
            QueryCall::From { table, alias } => {
                self.from(table_ref(table, alias.as_deref()));
            }
            QueryCall::GroupBy(column) => {
                self.group_by_col(column_ref(column));
            }
            QueryCall::Offset(offset) => {
                self.offset(*offset);
            }
            other => return Err(unsupported(Self::KIND, other.kind())),
        }
        Ok(())
    }

    fn add_join(&mut self, join: PendingJoin) -> Result<(), OrmError> {
        if join.on.is_empty() {
            return Err(OrmError::invalid(format!(
                "join({}) has no on() condition",
                join.table
            )));
        }
        let condition = join
            .on
            .into_iter()
            .fold(Condition::all(), |cond, expr| cond.add(expr));
        self.join(
            join.kind.to_join_type(),
            table_ref(&join.table, join.alias.as_deref()),
            condition,
        );
        Ok(())
    }

    fn add_having(&mut self, condition: SimpleExpr) -> Result<(), OrmError> {
        self.and_having(condition);
        Ok(())
    }
}

impl ReplayTarget for UpdateStatement {
    const KIND: StatementKind = StatementKind::Update;

    fn add_where(&mut self, condition: SimpleExpr) {
        self.and_where(condition);
    }

    fn add_order(&mut self, column: ColumnRef, order: Order) {
        self.order_by(column, order);
    }

    fn set_limit(&mut self, limit: u64) {
        self.limit(limit);
    }
}

impl ReplayTarget for DeleteStatement {
    const KIND: StatementKind = StatementKind::Delete;

    fn add_where(&mut self, condition: SimpleExpr) {
        self.and_where(condition);
    }

    fn add_order(&mut self, column: ColumnRef, order: Order) {
        self.order_by(column, order);
    }

    fn set_limit(&mut self, limit: u64) {
        self.limit(limit);
    }
}

/// Deferred calls of one record plus the bookkeeping around them
#[derive(Debug, Clone)]
pub struct PendingQuery {
    calls: Vec<QueryCall>,
    applied: HashSet<CallKind>,
    with_applied: HashSet<String>,
    reset_enabled: bool,
}

impl Default for PendingQuery {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            applied: HashSet::new(),
            with_applied: HashSet::new(),
            reset_enabled: true,
        }
    }
}

impl PendingQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, call: QueryCall) {
        self.calls.push(call);
    }

    pub fn calls(&self) -> &[QueryCall] {
        &self.calls
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Whether a call of this kind was replayed by the last build
    pub fn was_applied(&self, kind: CallKind) -> bool {
        self.applied.contains(&kind)
    }

    /// Whether `path` was already eager-loaded for the current statement
    pub fn has_with(&self, path: &str) -> bool {
        self.with_applied.contains(path)
    }

    /// Record `path` as eager-loaded; false if it already was
    pub fn mark_with(&mut self, path: &str) -> bool {
        self.with_applied.insert(path.to_string())
    }

    /// Discard the queue after a terminal operation.
    ///
    /// `reset(false)` suppresses the *next* reset, so the pending calls survive one
    /// terminal operation and can be reused by the following one.
    pub fn reset(&mut self, next: bool) {
        if next && self.reset_enabled {
            self.calls.clear();
            self.applied.clear();
            self.with_applied.clear();
        }
        self.reset_enabled = next;
    }

    /// Remove pending `select` calls, returning them with their queue positions
    pub fn take_selects(&mut self) -> Vec<(usize, QueryCall)> {
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(self.calls.len());
        for (idx, call) in self.calls.drain(..).enumerate() {
            if call.kind() == CallKind::Select {
                taken.push((idx, call));
            } else {
                kept.push(call);
            }
        }
        self.calls = kept;
        taken
    }

    /// Put calls removed by [`take_selects`](Self::take_selects) back in place
    pub fn restore_selects(&mut self, selects: Vec<(usize, QueryCall)>) {
        for (idx, call) in selects {
            let idx = idx.min(self.calls.len());
            self.calls.insert(idx, call);
        }
    }

    /// Build a SELECT with every pending call replayed (no FROM unless queued)
    pub fn build_select(&mut self) -> Result<SelectStatement, OrmError> {
        let mut select = Query::select();
        self.replay(&mut select)?;
        Ok(select)
    }

    /// Build an UPDATE of `table` with every pending call replayed
    pub fn build_update(&mut self, table: &str) -> Result<UpdateStatement, OrmError> {
        let mut update = Query::update();
        update.table(Alias::new(table));
        self.replay(&mut update)?;
        Ok(update)
    }

    /// Build a DELETE from `table` with every pending call replayed
    pub fn build_delete(&mut self, table: &str) -> Result<DeleteStatement, OrmError> {
        let mut delete = Query::delete();
        delete.from_table(Alias::new(table));
        self.replay(&mut delete)?;
        Ok(delete)
    }

    fn replay<T: ReplayTarget>(&mut self, target: &mut T) -> Result<(), OrmError> {
        let mut wheres = ConditionBuilder::new("where");
        let mut havings = ConditionBuilder::new("having");
        let mut join: Option<PendingJoin> = None;

        for call in &self.calls {
            let kind = call.kind();
            if !T::KIND.accepts(kind) {
                return Err(unsupported(T::KIND, kind));
            }

            if kind != CallKind::On {
                if let Some(pending) = join.take() {
                    target.add_join(pending)?;
                }
            }

            match call {
                QueryCall::Where {
                    logic,
                    column,
                    op,
                    operand,
                } => wheres.push(*logic, predicate(column, *op, operand)?),
                QueryCall::WhereOpen(logic) => wheres.open(*logic),
                QueryCall::WhereClose => wheres.close()?,
                QueryCall::Having {
                    logic,
                    column,
                    op,
                    operand,
                } => havings.push(*logic, predicate(column, *op, operand)?),
                QueryCall::HavingOpen(logic) => havings.open(*logic),
                QueryCall::HavingClose => havings.close()?,
                QueryCall::Join { table, alias, kind } => {
                    join = Some(PendingJoin {
                        table: table.clone(),
                        alias: alias.clone(),
                        kind: *kind,
                        on: Vec::new(),
                    });
                }
                QueryCall::On { left, op, right } => {
                    let pending = join.as_mut().ok_or_else(|| {
                        OrmError::invalid("on() called without a preceding join()")
                    })?;
                    pending.on.push(predicate(
                        left,
                        *op,
                        &Operand::Column(right.clone()),
                    )?);
                }
                QueryCall::OrderBy { column, direction } => {
                    target.add_order(column_ref(column), direction.to_order())
                }
                QueryCall::Limit(limit) => target.set_limit(*limit),
                other => target.apply_select(other)?,
            }

            self.applied.insert(kind);
        }

        if let Some(pending) = join.take() {
            target.add_join(pending)?;
        }
        if let Some(condition) = wheres.finish()? {
            target.add_where(condition);
        }
        if let Some(condition) = havings.finish()? {
            target.add_having(condition)?;
        }

        log::debug!(
            "Replayed {} deferred call(s) onto {} statement",
            self.calls.len(),
            T::KIND
        );
        Ok(())
    }
}

/// Shorthand for a queued `where` call
pub(crate) fn where_call(logic: Logic, column: &str, op: Op, operand: Operand) -> QueryCall {
    QueryCall::Where {
        logic,
        column: column.to_string(),
        op,
        operand,
    }
}
