//! Condition assembly for replayed `where` and `having` calls.
//!
//! Conditions are combined with SQL precedence: `AND` binds tighter than `OR`, and
//! `*_open` / `*_close` pairs form parenthesised groups that nest arbitrarily.

use super::call::{column_ref, Logic, Op, Operand};
use crate::error::OrmError;
use crate::value::is_null;
use sea_query::{BinOper, Expr, SimpleExpr};

/// Build the predicate for `column op operand`
pub fn predicate(column: &str, op: Op, operand: &Operand) -> Result<SimpleExpr, OrmError> {
    let col = Expr::col(column_ref(column));

    let expr = match (op, operand) {
        (Op::IsNull, _) => col.is_null(),
        (Op::IsNotNull, _) => col.is_not_null(),
        (Op::Eq, Operand::Value(v)) if is_null(v) => col.is_null(),
        (Op::Ne, Operand::Value(v)) if is_null(v) => col.is_not_null(),
        (Op::In, Operand::List(values)) => col.is_in(values.iter().cloned()),
        (Op::NotIn, Operand::List(values)) => col.is_not_in(values.iter().cloned()),
        (Op::In, Operand::Value(v)) => col.is_in([v.clone()]),
        (Op::NotIn, Operand::Value(v)) => col.is_not_in([v.clone()]),
        (Op::Between, Operand::List(values)) => match values.as_slice() {
            [low, high] => col.between(low.clone(), high.clone()),
            _ => {
                return Err(OrmError::invalid(format!(
                    "BETWEEN on {} needs exactly two values, got {}",
                    column,
                    values.len()
                )))
            }
        },
        (op, Operand::Value(v)) => match binary_op(op) {
            Some(bin) => col.binary(bin, v.clone()),
            None => return Err(mismatch(column, op, operand)),
        },
        (op, Operand::Column(other)) => match binary_op(op) {
            Some(bin) => col.binary(bin, Expr::col(column_ref(other))),
            None => return Err(mismatch(column, op, operand)),
        },
        (op, operand) => return Err(mismatch(column, op, operand)),
    };

    Ok(expr)
}

fn mismatch(column: &str, op: Op, operand: &Operand) -> OrmError {
    OrmError::invalid(format!(
        "operator {} cannot be applied to {} with operand {:?}",
        op, column, operand
    ))
}

fn binary_op(op: Op) -> Option<BinOper> {
    let bin = match op {
        Op::Eq => BinOper::Equal,
        Op::Ne => BinOper::NotEqual,
        Op::Lt => BinOper::SmallerThan,
        Op::Lte => BinOper::SmallerThanOrEqual,
        Op::Gt => BinOper::GreaterThan,
        Op::Gte => BinOper::GreaterThanOrEqual,
        Op::Like => BinOper::Like,
        Op::NotLike => BinOper::NotLike,
        Op::In | Op::NotIn | Op::IsNull | Op::IsNotNull | Op::Between => return None,
    };
    Some(bin)
}

#[derive(Debug)]
struct Group {
    logic: Logic,
    // conjunction currently being extended
    chain: Option<SimpleExpr>,
    // finished conjunctions, joined with OR
    alternatives: Vec<SimpleExpr>,
}

impl Group {
    fn new(logic: Logic) -> Self {
        Self {
            logic,
            chain: None,
            alternatives: Vec::new(),
        }
    }

    fn push(&mut self, logic: Logic, expr: SimpleExpr) {
        self.chain = Some(match (self.chain.take(), logic) {
            (None, _) => expr,
            (Some(chain), Logic::And) => chain.and(expr),
            (Some(chain), Logic::Or) => {
                self.alternatives.push(chain);
                expr
            }
        });
    }

    fn finish(mut self) -> Option<SimpleExpr> {
        if let Some(chain) = self.chain.take() {
            self.alternatives.push(chain);
        }
        let mut alternatives = self.alternatives.into_iter();
        let first = alternatives.next()?;
        Some(alternatives.fold(first, |acc, expr| acc.or(expr)))
    }
}

/// Stack of open condition groups; the bottom entry is the statement's top level
#[derive(Debug)]
pub struct ConditionBuilder {
    clause: &'static str,
    stack: Vec<Group>,
}

impl ConditionBuilder {
    pub fn new(clause: &'static str) -> Self {
        Self {
            clause,
            stack: vec![Group::new(Logic::And)],
        }
    }

    pub fn push(&mut self, logic: Logic, expr: SimpleExpr) {
        if let Some(group) = self.stack.last_mut() {
            group.push(logic, expr);
        }
    }

    pub fn open(&mut self, logic: Logic) {
        self.stack.push(Group::new(logic));
    }

    pub fn close(&mut self) -> Result<(), OrmError> {
        if self.stack.len() < 2 {
            return Err(OrmError::invalid(format!(
                "{}_close called without a matching {}_open",
                self.clause, self.clause
            )));
        }
        if let Some(group) = self.stack.pop() {
            let logic = group.logic;
            // empty groups vanish
            if let Some(expr) = group.finish() {
                self.push(logic, expr);
            }
        }
        Ok(())
    }

    /// The combined condition, or `None` when nothing was pushed
    pub fn finish(mut self) -> Result<Option<SimpleExpr>, OrmError> {
        if self.stack.len() != 1 {
            return Err(OrmError::invalid(format!(
                "{} {}_open call(s) left unclosed",
                self.stack.len() - 1,
                self.clause
            )));
        }
        Ok(self.stack.pop().and_then(Group::finish))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::{Alias, ConditionalStatement, PostgresQueryBuilder, Query, QueryStatementWriter};

    fn render(expr: SimpleExpr) -> String {
        Query::select()
            .column(Alias::new("id"))
            .from(Alias::new("t"))
            .and_where(expr)
            .to_string(PostgresQueryBuilder)
    }

    fn eq(col: &str, v: i32) -> SimpleExpr {
        predicate(col, Op::Eq, &Operand::from(v)).unwrap()
    }

    #[test]
    fn test_predicate_null_becomes_is_null() {
        let expr = predicate("deleted_at", Op::Eq, &Operand::Value(sea_query::Value::Int(None))).unwrap();
        assert_eq!(render(expr), r#"SELECT "id" FROM "t" WHERE "deleted_at" IS NULL"#);
    }

    #[test]
    fn test_predicate_column_operand() {
        let expr = predicate("posts.author_id", Op::Eq, &Operand::column("users.id")).unwrap();
        assert_eq!(
            render(expr),
            r#"SELECT "id" FROM "t" WHERE "posts"."author_id" = "users"."id""#
        );
    }

    #[test]
    fn test_predicate_rejects_list_for_comparison() {
        let err = predicate("id", Op::Gt, &Operand::list([1, 2])).unwrap_err();
        assert!(matches!(err, OrmError::InvalidOperation(_)));
    }

    #[test]
    fn test_between_needs_two_values() {
        assert!(predicate("id", Op::Between, &Operand::list([1])).is_err());
        let expr = predicate("id", Op::Between, &Operand::list([1, 9])).unwrap();
        assert_eq!(render(expr), r#"SELECT "id" FROM "t" WHERE "id" BETWEEN 1 AND 9"#);
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let mut builder = ConditionBuilder::new("where");
        builder.push(Logic::And, eq("a", 1));
        builder.push(Logic::Or, eq("b", 2));
        builder.push(Logic::And, eq("c", 3));
        let expr = builder.finish().unwrap().unwrap();
        assert_eq!(
            render(expr),
            r#"SELECT "id" FROM "t" WHERE "a" = 1 OR ("b" = 2 AND "c" = 3)"#
        );
    }

    #[test]
    fn test_groups_nest() {
        let mut builder = ConditionBuilder::new("where");
        builder.push(Logic::And, eq("a", 1));
        builder.open(Logic::And);
        builder.push(Logic::And, eq("b", 2));
        builder.push(Logic::Or, eq("c", 3));
        builder.close().unwrap();
        let expr = builder.finish().unwrap().unwrap();
        assert_eq!(
            render(expr),
            r#"SELECT "id" FROM "t" WHERE "a" = 1 AND ("b" = 2 OR "c" = 3)"#
        );
    }

    #[test]
    fn test_unbalanced_groups_fail() {
        let mut builder = ConditionBuilder::new("where");
        assert!(builder.close().is_err());

        let mut builder = ConditionBuilder::new("having");
        builder.open(Logic::Or);
        assert!(builder.finish().is_err());
    }

    #[test]
    fn test_empty_group_is_dropped() {
        let mut builder = ConditionBuilder::new("where");
        builder.open(Logic::And);
        builder.close().unwrap();
        assert!(builder.finish().unwrap().is_none());
    }
}
