use crate::{
    error::Result,
    sql::{
        engine::Transaction,
        executor::{
            agg::Aggregate,
            join::NestedLoopJoin,
            query::{Filter, Limit, Offset, Order, Projection, Scan},
        },
        plan::Node,
        types::Row,
    },
};

mod agg;
mod join;
mod query;

/// SQL executor trait
pub trait Executor<T: Transaction> {
    fn execute(self: Box<Self>, txn: &mut T) -> Result<ResultSet>;
}

/// Builds an executor from a plan node
///
/// The `'static` bound is required for trait object usage in recursive executor building.
impl<T: Transaction + 'static> dyn Executor<T> {
    pub fn build(node: Node) -> Box<dyn Executor<T>> {
        match node {
            Node::Scan { table_name, alias } => Scan::new(table_name, alias),
            Node::NestedLoopJoin {
                left,
                right,
                predicate,
                outer,
            } => NestedLoopJoin::new(Self::build(*left), Self::build(*right), predicate, outer),
            Node::Filter { source, predicate } => Filter::new(Self::build(*source), predicate),
            Node::Aggregate {
                source,
                group_by,
                having,
                exprs,
            } => Aggregate::new(Self::build(*source), group_by, having, exprs),
            Node::Order { source, order_by } => Order::new(Self::build(*source), order_by),
            Node::Offset { source, offset } => Offset::new(Self::build(*source), offset),
            Node::Limit { source, limit } => Limit::new(Self::build(*source), limit),
            Node::Projection { source, exprs } => Projection::new(Self::build(*source), exprs),
        }
    }
}

/// Rows produced by a query, with one label per column
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
