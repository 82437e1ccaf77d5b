//! Deferred builder calls.
//!
//! Records accept builder calls (filters, joins, sorting, paging) before they know
//! whether the terminal operation will read, update or delete. Each call is stored
//! as a [`QueryCall`] and replayed later onto the concrete statement.

use sea_query::{Alias, ColumnRef, IntoIden, Order, TableRef, Value};
use std::fmt;

/// Connective joining a condition to the one before it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
}

/// Comparison operator of a `where`, `having` or `on` clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Between,
}

impl Op {
    /// Parse the textual operator form (`=`, `!=`, `<=`, `like`, `not in`, ...)
    pub fn parse(op: &str) -> Option<Op> {
        let op = op.trim().to_ascii_lowercase();
        let parsed = match op.as_str() {
            "=" | "==" => Op::Eq,
            "!=" | "<>" => Op::Ne,
            "<" => Op::Lt,
            "<=" => Op::Lte,
            ">" => Op::Gt,
            ">=" => Op::Gte,
            "like" => Op::Like,
            "not like" => Op::NotLike,
            "in" => Op::In,
            "not in" => Op::NotIn,
            "is" | "is null" => Op::IsNull,
            "is not" | "is not null" => Op::IsNotNull,
            "between" => Op::Between,
            _ => return None,
        };
        Some(parsed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Like => "LIKE",
            Op::NotLike => "NOT LIKE",
            Op::In => "IN",
            Op::NotIn => "NOT IN",
            Op::IsNull => "IS NULL",
            Op::IsNotNull => "IS NOT NULL",
            Op::Between => "BETWEEN",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a condition
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A bound value
    Value(Value),
    /// A list of bound values (`IN`, `NOT IN`, `BETWEEN`)
    List(Vec<Value>),
    /// Another column, e.g. `posts.author_id`
    Column(String),
    /// No operand (`IS NULL`, `IS NOT NULL`)
    None,
}

impl Operand {
    pub fn value(value: impl Into<Value>) -> Self {
        Operand::Value(value.into())
    }

    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Operand::List(values.into_iter().map(Into::into).collect())
    }

    pub fn column(name: impl Into<String>) -> Self {
        Operand::Column(name.into())
    }
}

macro_rules! impl_operand_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(value: $ty) -> Self {
                    Operand::Value(value.into())
                }
            }
        )*
    };
}

impl_operand_from!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String, &str, Value);

impl From<Vec<Value>> for Operand {
    fn from(values: Vec<Value>) -> Self {
        Operand::List(values)
    }
}

impl From<()> for Operand {
    fn from(_: ()) -> Self {
        Operand::None
    }
}

/// Join flavour accepted by `join()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub(crate) fn to_join_type(self) -> sea_query::JoinType {
        match self {
            JoinKind::Inner => sea_query::JoinType::InnerJoin,
            JoinKind::Left => sea_query::JoinType::LeftJoin,
            JoinKind::Right => sea_query::JoinType::RightJoin,
        }
    }
}

/// Sort direction of `order_by()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub(crate) fn to_order(self) -> Order {
        match self {
            Direction::Asc => Order::Asc,
            Direction::Desc => Order::Desc,
        }
    }
}

/// One deferred builder invocation
#[derive(Debug, Clone, PartialEq)]
pub enum QueryCall {
    Where {
        logic: Logic,
        column: String,
        op: Op,
        operand: Operand,
    },
    WhereOpen(Logic),
    WhereClose,
    Having {
        logic: Logic,
        column: String,
        op: Op,
        operand: Operand,
    },
    HavingOpen(Logic),
    HavingClose,
    Distinct(bool),
    Select {
        column: String,
        alias: Option<String>,
    },
    From {
        table: String,
        alias: Option<String>,
    },
    Join {
        table: String,
        alias: Option<String>,
        kind: JoinKind,
    },
    On {
        left: String,
        op: Op,
        right: String,
    },
    GroupBy(String),
    OrderBy {
        column: String,
        direction: Direction,
    },
    Limit(u64),
    Offset(u64),
}

/// Name of a deferred call, tracked in the applied set after a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Where,
    WhereOpen,
    WhereClose,
    Having,
    HavingOpen,
    HavingClose,
    Distinct,
    Select,
    From,
    Join,
    On,
    GroupBy,
    OrderBy,
    Limit,
    Offset,
}

impl CallKind {
    pub fn name(self) -> &'static str {
        match self {
            CallKind::Where => "where",
            CallKind::WhereOpen => "where_open",
            CallKind::WhereClose => "where_close",
            CallKind::Having => "having",
            CallKind::HavingOpen => "having_open",
            CallKind::HavingClose => "having_close",
            CallKind::Distinct => "distinct",
            CallKind::Select => "select",
            CallKind::From => "from",
            CallKind::Join => "join",
            CallKind::On => "on",
            CallKind::GroupBy => "group_by",
            CallKind::OrderBy => "order_by",
            CallKind::Limit => "limit",
            CallKind::Offset => "offset",
        }
    }
}

impl QueryCall {
    pub fn kind(&self) -> CallKind {
        match self {
            QueryCall::Where { .. } => CallKind::Where,
            QueryCall::WhereOpen(_) => CallKind::WhereOpen,
            QueryCall::WhereClose => CallKind::WhereClose,
            QueryCall::Having { .. } => CallKind::Having,
            QueryCall::HavingOpen(_) => CallKind::HavingOpen,
            QueryCall::HavingClose => CallKind::HavingClose,
            QueryCall::Distinct(_) => CallKind::Distinct,
            QueryCall::Select { .. } => CallKind::Select,
            QueryCall::From { .. } => CallKind::From,
            QueryCall::Join { .. } => CallKind::Join,
            QueryCall::On { .. } => CallKind::On,
            QueryCall::GroupBy(_) => CallKind::GroupBy,
            QueryCall::OrderBy { .. } => CallKind::OrderBy,
            QueryCall::Limit(_) => CallKind::Limit,
            QueryCall::Offset(_) => CallKind::Offset,
        }
    }
}

/// Parse a possibly qualified column name into a sea-query column reference.
///
/// Accepts `*`, `table.*`, `column`, `table.column` and `schema.table.column`.
/// Eager-load aliases such as `author:country` are plain identifiers here.
pub fn column_ref(name: &str) -> ColumnRef {
    let parts: Vec<&str> = name.split('.').collect();
    match parts.as_slice() {
        ["*"] => ColumnRef::Asterisk,
        [table, "*"] => ColumnRef::TableAsterisk(Alias::new(*table).into_iden()),
        [table, column] => ColumnRef::TableColumn(
            Alias::new(*table).into_iden(),
            Alias::new(*column).into_iden(),
        ),
        [schema, table, column] => ColumnRef::SchemaTableColumn(
            Alias::new(*schema).into_iden(),
            Alias::new(*table).into_iden(),
            Alias::new(*column).into_iden(),
        ),
        _ => ColumnRef::Column(Alias::new(name).into_iden()),
    }
}

/// Parse a possibly schema-qualified table name, with an optional alias.
pub fn table_ref(name: &str, alias: Option<&str>) -> TableRef {
    let (schema, table) = match name.split_once('.') {
        Some((schema, table)) => (Some(schema), table),
        None => (None, name),
    };
    let table = Alias::new(table).into_iden();
    match (schema, alias) {
        (None, None) => TableRef::Table(table),
        (None, Some(alias)) => TableRef::TableAlias(table, Alias::new(alias).into_iden()),
        (Some(schema), None) => TableRef::SchemaTable(Alias::new(schema).into_iden(), table),
        (Some(schema), Some(alias)) => TableRef::SchemaTableAlias(
            Alias::new(schema).into_iden(),
            table,
            Alias::new(alias).into_iden(),
        ),
    }
}
