use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::{executor::ResultSet, parser::Parser, plan::Plan, schema::Table, types::Row};

pub mod kv;

/// SQL engine trait
pub trait Engine: Clone {
    type Transaction: Transaction + 'static;

    fn begin(&self) -> Result<Self::Transaction>;

    fn session(&self) -> Result<Session<Self>> {
        Ok(Session {
            engine: self.clone(),
        })
    }
}

/// SQL transaction trait (DDL and row operations)
///
/// A transaction must be finished with either `commit` or `rollback`;
/// writes become visible to later transactions only after `commit`.
pub trait Transaction {
    fn commit(self) -> Result<()>;
    fn rollback(self) -> Result<()>;

    /// Inserts a row, keyed by the table's primary key
    fn create_row(&mut self, table_name: &str, row: Row) -> Result<()>;
    /// Scans all rows of a table in key order
    fn scan_table(&self, table_name: &str) -> Result<Vec<Row>>;

    // DDL operations
    fn create_table(&mut self, table: Table) -> Result<()>;
    fn get_table(&self, table_name: &str) -> Result<Option<Table>>;
    /// Returns table info, returns error if table doesn't exist
    fn must_get_table(&self, table_name: &str) -> Result<Table> {
        self.get_table(table_name)?
            .ok_or(Error::Internal(format!(
                "table {} does not exist",
                table_name
            )))
    }
}

/// SQL session for executing statements
///
/// Every `execute` call runs in its own transaction, which is always
/// closed before returning: committed on success, rolled back on failure.
pub struct Session<E: Engine> {
    engine: E,
}

impl<E: Engine + 'static> Session<E> {
    /// Executes a SQL statement
    pub fn execute(&mut self, sql: &str) -> Result<ResultSet> {
        let stmt = Parser::new(sql).parse()?;
        let plan = Plan::build(stmt)?;
        debug!(?plan, "executing statement");

        let mut txn = self.engine.begin()?;
        match plan.execute(&mut txn) {
            Ok(result) => {
                txn.commit()?;
                debug!(rows = result.len(), "statement finished");
                Ok(result)
            }
            Err(err) => {
                warn!(%err, sql, "statement failed, rolling back");
                txn.rollback()?;
                Err(err)
            }
        }
    }
}
