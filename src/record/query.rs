//! Fluent deferred-call API.
//!
//! Every method queues one [`QueryCall`] on the record and returns the record, so
//! calls chain into a terminal operation:
//!
//! ```ignore
//! post.and_where("published", Op::Eq, true)
//!     .order_by("created", Direction::Desc)
//!     .limit(10)
//!     .find_all()?;
//! ```
//!
//! Nothing is validated until the terminal operation replays the queue.

use super::Record;
use crate::query::builder::where_call;
use crate::query::{Direction, JoinKind, Logic, Op, Operand, QueryCall};

impl Record {
    /// Queue a raw call
    pub fn push_call(&mut self, call: QueryCall) -> &mut Self {
        self.pending.push(call);
        self
    }

    /// Calls queued for the next statement
    pub fn pending_calls(&self) -> &[QueryCall] {
        self.pending.calls()
    }

    /// Same as [`and_where`](Self::and_where)
    pub fn where_(&mut self, column: impl Into<String>, op: Op, operand: impl Into<Operand>) -> &mut Self {
        self.and_where(column, op, operand)
    }

    pub fn and_where(&mut self, column: impl Into<String>, op: Op, operand: impl Into<Operand>) -> &mut Self {
        let column = column.into();
        self.push_call(where_call(Logic::And, &column, op, operand.into()))
    }

    pub fn or_where(&mut self, column: impl Into<String>, op: Op, operand: impl Into<Operand>) -> &mut Self {
        let column = column.into();
        self.push_call(where_call(Logic::Or, &column, op, operand.into()))
    }

    /// Open a parenthesized group joined with AND
    pub fn where_open(&mut self) -> &mut Self {
        self.and_where_open()
    }

    pub fn and_where_open(&mut self) -> &mut Self {
        self.push_call(QueryCall::WhereOpen(Logic::And))
    }

    pub fn or_where_open(&mut self) -> &mut Self {
        self.push_call(QueryCall::WhereOpen(Logic::Or))
    }

    /// Close the innermost open group; the group's own AND/OR was fixed when it was opened
    pub fn where_close(&mut self) -> &mut Self {
        self.push_call(QueryCall::WhereClose)
    }

    /// Alias of [`where_close`](Self::where_close)
    pub fn and_where_close(&mut self) -> &mut Self {
        self.where_close()
    }

    /// Alias of [`where_close`](Self::where_close)
    pub fn or_where_close(&mut self) -> &mut Self {
        self.where_close()
    }

    pub fn having(&mut self, column: impl Into<String>, op: Op, operand: impl Into<Operand>) -> &mut Self {
        self.and_having(column, op, operand)
    }

    pub fn and_having(&mut self, column: impl Into<String>, op: Op, operand: impl Into<Operand>) -> &mut Self {
        self.push_call(QueryCall::Having {
            logic: Logic::And,
            column: column.into(),
            op,
            operand: operand.into(),
        })
    }

    pub fn or_having(&mut self, column: impl Into<String>, op: Op, operand: impl Into<Operand>) -> &mut Self {
        self.push_call(QueryCall::Having {
            logic: Logic::Or,
            column: column.into(),
            op,
            operand: operand.into(),
        })
    }

    pub fn having_open(&mut self) -> &mut Self {
        self.and_having_open()
    }

    pub fn and_having_open(&mut self) -> &mut Self {
        self.push_call(QueryCall::HavingOpen(Logic::And))
    }

    pub fn or_having_open(&mut self) -> &mut Self {
        self.push_call(QueryCall::HavingOpen(Logic::Or))
    }

    /// Close the innermost open group; the group's own AND/OR was fixed when it was opened
    pub fn having_close(&mut self) -> &mut Self {
        self.push_call(QueryCall::HavingClose)
    }

    /// Alias of [`having_close`](Self::having_close)
    pub fn and_having_close(&mut self) -> &mut Self {
        self.having_close()
    }

    /// Alias of [`having_close`](Self::having_close)
    pub fn or_having_close(&mut self) -> &mut Self {
        self.having_close()
    }

    pub fn distinct(&mut self, distinct: bool) -> &mut Self {
        self.push_call(QueryCall::Distinct(distinct))
    }

    /// Add a column to the select list
    pub fn select(&mut self, column: impl Into<String>) -> &mut Self {
        self.push_call(QueryCall::Select {
            column: column.into(),
            alias: None,
        })
    }

    /// Add an aliased column to the select list
    pub fn select_as(&mut self, column: impl Into<String>, alias: impl Into<String>) -> &mut Self {
        self.push_call(QueryCall::Select {
            column: column.into(),
            alias: Some(alias.into()),
        })
    }

    /// Add a table to the FROM list, next to the model's own table
    pub fn from(&mut self, table: impl Into<String>) -> &mut Self {
        self.push_call(QueryCall::From {
            table: table.into(),
            alias: None,
        })
    }

    pub fn from_as(&mut self, table: impl Into<String>, alias: impl Into<String>) -> &mut Self {
        self.push_call(QueryCall::From {
            table: table.into(),
            alias: Some(alias.into()),
        })
    }

    /// Start a join; follow it with one or more [`on`](Self::on) calls
    pub fn join(&mut self, table: impl Into<String>, kind: JoinKind) -> &mut Self {
        self.push_call(QueryCall::Join {
            table: table.into(),
            alias: None,
            kind,
        })
    }

    pub fn join_as(&mut self, table: impl Into<String>, alias: impl Into<String>, kind: JoinKind) -> &mut Self {
        self.push_call(QueryCall::Join {
            table: table.into(),
            alias: Some(alias.into()),
            kind,
        })
    }

    /// Join condition between two columns
    pub fn on(&mut self, left: impl Into<String>, op: Op, right: impl Into<String>) -> &mut Self {
        self.push_call(QueryCall::On {
            left: left.into(),
            op,
            right: right.into(),
        })
    }

    pub fn group_by(&mut self, column: impl Into<String>) -> &mut Self {
        self.push_call(QueryCall::GroupBy(column.into()))
    }

    /// Order the next select; suppresses the model's default sorting
    pub fn order_by(&mut self, column: impl Into<String>, direction: Direction) -> &mut Self {
        self.push_call(QueryCall::OrderBy {
            column: column.into(),
            direction,
        })
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.push_call(QueryCall::Limit(limit))
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.push_call(QueryCall::Offset(offset))
    }
}
