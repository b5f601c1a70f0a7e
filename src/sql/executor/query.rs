use std::cmp::Ordering;

use crate::{
    error::{Error, Result},
    sql::{
        engine::Transaction,
        executor::ResultSet,
        parser::ast::{evaluate_expr, Expression, OrderDirection},
        types::Value,
    },
};

use super::Executor;

/// Table scan executor
pub struct Scan {
    table_name: String,
    alias: Option<String>,
}

impl Scan {
    pub fn new(table_name: String, alias: Option<String>) -> Box<Self> {
        Box::new(Self { table_name, alias })
    }
}

impl<T: Transaction> Executor<T> for Scan {
    fn execute(self: Box<Self>, txn: &mut T) -> Result<ResultSet> {
        let table = txn.must_get_table(&self.table_name)?;
        let rows = txn.scan_table(&self.table_name)?;
        // Labels are qualified so that joined copies of a table stay apart
        let qualifier = self.alias.unwrap_or(self.table_name);
        Ok(ResultSet {
            columns: table
                .columns
                .iter()
                .map(|c| format!("{}.{}", qualifier, c.name))
                .collect(),
            rows,
        })
    }
}

/// WHERE executor - keeps rows for which the predicate is TRUE
pub struct Filter<T: Transaction> {
    source: Box<dyn Executor<T>>,
    predicate: Expression,
}

impl<T: Transaction> Filter<T> {
    pub fn new(source: Box<dyn Executor<T>>, predicate: Expression) -> Box<Self> {
        Box::new(Self { source, predicate })
    }
}

impl<T: Transaction> Executor<T> for Filter<T> {
    fn execute(self: Box<Self>, txn: &mut T) -> Result<ResultSet> {
        let ResultSet { columns, rows } = self.source.execute(txn)?;
        let mut kept = Vec::new();
        for row in rows {
            match evaluate_expr(&self.predicate, &columns, &row)? {
                Value::Boolean(true) => kept.push(row),
                Value::Boolean(false) | Value::Null => {}
                v => {
                    return Err(Error::Internal(format!(
                        "filter {} evaluated to non-boolean {}",
                        self.predicate, v
                    )))
                }
            }
        }
        Ok(ResultSet { columns, rows: kept })
    }
}

/// ORDER BY executor - sorts rows by the given expressions
pub struct Order<T: Transaction> {
    source: Box<dyn Executor<T>>,
    order_by: Vec<(Expression, OrderDirection)>,
}

impl<T: Transaction> Order<T> {
    pub fn new(
        source: Box<dyn Executor<T>>,
        order_by: Vec<(Expression, OrderDirection)>,
    ) -> Box<Self> {
        Box::new(Self { source, order_by })
    }
}

impl<T: Transaction> Executor<T> for Order<T> {
    fn execute(self: Box<Self>, txn: &mut T) -> Result<ResultSet> {
        let ResultSet { columns, rows } = self.source.execute(txn)?;

        // Evaluate the sort keys once per row, then sort rows together with their keys
        let mut keyed = rows
            .into_iter()
            .map(|row| {
                let keys = self
                    .order_by
                    .iter()
                    .map(|(expr, _)| evaluate_expr(expr, &columns, &row))
                    .collect::<Result<Vec<_>>>()?;
                Ok((keys, row))
            })
            .collect::<Result<Vec<_>>>()?;

        // Multi-column sort: compare key by key according to ORDER BY clause
        // - If comparison is Equal, continue to next key
        // - If Less/Greater, apply ASC/DESC direction and return
        // - If types are incomparable (None), continue to next key
        keyed.sort_by(|(k1, _), (k2, _)| {
            for (i, (_, direction)) in self.order_by.iter().enumerate() {
                match k1[i].partial_cmp(&k2[i]) {
                    Some(Ordering::Equal) | None => {}
                    Some(o) => {
                        return match direction {
                            OrderDirection::Asc => o,
                            OrderDirection::Desc => o.reverse(),
                        }
                    }
                }
            }
            Ordering::Equal
        });

        Ok(ResultSet {
            columns,
            rows: keyed.into_iter().map(|(_, row)| row).collect(),
        })
    }
}

/// LIMIT executor - restricts the number of rows returned
pub struct Limit<T: Transaction> {
    source: Box<dyn Executor<T>>,
    limit: usize,
}

impl<T: Transaction> Limit<T> {
    pub fn new(source: Box<dyn Executor<T>>, limit: usize) -> Box<Self> {
        Box::new(Self { source, limit })
    }
}

impl<T: Transaction> Executor<T> for Limit<T> {
    fn execute(self: Box<Self>, txn: &mut T) -> Result<ResultSet> {
        let ResultSet { columns, rows } = self.source.execute(txn)?;
        Ok(ResultSet {
            columns,
            rows: rows.into_iter().take(self.limit).collect(),
        })
    }
}

/// OFFSET executor - skips the first N rows
pub struct Offset<T: Transaction> {
    source: Box<dyn Executor<T>>,
    offset: usize,
}

impl<T: Transaction> Offset<T> {
    pub fn new(source: Box<dyn Executor<T>>, offset: usize) -> Box<Self> {
        Box::new(Self { source, offset })
    }
}

impl<T: Transaction> Executor<T> for Offset<T> {
    fn execute(self: Box<Self>, txn: &mut T) -> Result<ResultSet> {
        let ResultSet { columns, rows } = self.source.execute(txn)?;
        Ok(ResultSet {
            columns,
            rows: rows.into_iter().skip(self.offset).collect(),
        })
    }
}

/// Projection executor - evaluates the select list for every row
pub struct Projection<T: Transaction> {
    source: Box<dyn Executor<T>>,
    exprs: Vec<(Expression, Option<String>)>,
}

impl<T: Transaction> Projection<T> {
    pub fn new(
        source: Box<dyn Executor<T>>,
        exprs: Vec<(Expression, Option<String>)>,
    ) -> Box<Self> {
        Box::new(Self { source, exprs })
    }
}

impl<T: Transaction> Executor<T> for Projection<T> {
    fn execute(self: Box<Self>, txn: &mut T) -> Result<ResultSet> {
        let ResultSet { columns, rows } = self.source.execute(txn)?;
        let new_rows = rows
            .iter()
            .map(|row| {
                self.exprs
                    .iter()
                    .map(|(expr, _)| evaluate_expr(expr, &columns, row))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ResultSet {
            columns: self
                .exprs
                .into_iter()
                .map(|(expr, alias)| alias.unwrap_or_else(|| expr.to_string()))
                .collect(),
            rows: new_rows,
        })
    }
}
