use crate::{
    error::Result,
    sql::{
        engine::Transaction,
        executor::{Executor, ResultSet},
        parser::ast::{self, Expression, OrderDirection},
    },
};

mod planner;
use planner::Planner;

/// Execution plan node
#[derive(Debug, PartialEq)]
pub enum Node {
    /// Full table scan; columns are labelled `alias.column`
    Scan {
        table_name: String,
        alias: Option<String>,
    },
    NestedLoopJoin {
        left: Box<Node>,
        right: Box<Node>,
        predicate: Option<Expression>,
        outer: bool,
    },
    /// WHERE filter
    Filter {
        source: Box<Node>,
        predicate: Expression,
    },
    /// GROUP BY / HAVING and aggregate evaluation
    Aggregate {
        source: Box<Node>,
        group_by: Option<Expression>,
        having: Option<Expression>,
        exprs: Vec<(Expression, Option<String>)>,
    },
    Order {
        source: Box<Node>,
        order_by: Vec<(Expression, OrderDirection)>,
    },
    Offset {
        source: Box<Node>,
        offset: usize,
    },
    Limit {
        source: Box<Node>,
        limit: usize,
    },
    Projection {
        source: Box<Node>,
        exprs: Vec<(Expression, Option<String>)>,
    },
}

/// Execution plan, the root node of a tree of [`Node`]s
#[derive(Debug, PartialEq)]
pub struct Plan(pub Node);

impl Plan {
    pub fn build(stmt: ast::Statement) -> Result<Self> {
        Planner::new().build(stmt)
    }

    pub fn execute<T: Transaction + 'static>(self, txn: &mut T) -> Result<ResultSet> {
        <dyn Executor<T>>::build(self.0).execute(txn)
    }
}
