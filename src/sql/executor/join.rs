use crate::{
    error::{Error, Result},
    sql::{
        engine::Transaction,
        parser::ast::{evaluate_expr, Expression},
        types::Value,
    },
};

use super::{Executor, ResultSet};

/// Nested Loop Join executor
///
/// Without a predicate this is a CROSS JOIN. With `outer` set, left rows
/// that match nothing are kept and padded with NULLs (LEFT JOIN).
pub struct NestedLoopJoin<T: Transaction> {
    left: Box<dyn Executor<T>>,
    right: Box<dyn Executor<T>>,
    predicate: Option<Expression>,
    outer: bool,
}

impl<T: Transaction> NestedLoopJoin<T> {
    pub fn new(
        left: Box<dyn Executor<T>>,
        right: Box<dyn Executor<T>>,
        predicate: Option<Expression>,
        outer: bool,
    ) -> Box<Self> {
        Box::new(Self {
            left,
            right,
            predicate,
            outer,
        })
    }
}

impl<T: Transaction> Executor<T> for NestedLoopJoin<T> {
    fn execute(self: Box<Self>, txn: &mut T) -> Result<ResultSet> {
        let ResultSet {
            columns: lcols,
            rows: lrows,
        } = self.left.execute(txn)?;
        let ResultSet {
            columns: rcols,
            rows: rrows,
        } = self.right.execute(txn)?;

        // Predicates see the combined row, so columns from both sides resolve
        let mut new_cols = lcols;
        new_cols.extend(rcols.iter().cloned());

        let mut new_rows = Vec::new();
        for lrow in &lrows {
            let mut matched = false;
            for rrow in &rrows {
                let mut row = lrow.clone();
                row.extend(rrow.iter().cloned());

                let keep = match &self.predicate {
                    None => true,
                    Some(expr) => match evaluate_expr(expr, &new_cols, &row)? {
                        Value::Boolean(b) => b,
                        Value::Null => false,
                        v => {
                            return Err(Error::Internal(format!(
                                "join predicate evaluated to non-boolean {}",
                                v
                            )))
                        }
                    },
                };
                if keep {
                    new_rows.push(row);
                    matched = true;
                }
            }

            if self.outer && !matched {
                let mut row = lrow.clone();
                row.extend(std::iter::repeat(Value::Null).take(rcols.len()));
                new_rows.push(row);
            }
        }

        Ok(ResultSet {
            columns: new_cols,
            rows: new_rows,
        })
    }
}
