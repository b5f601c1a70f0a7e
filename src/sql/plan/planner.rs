use crate::{
    error::{Error, Result},
    sql::{
        parser::ast::{self, Expression, OrderDirection},
        plan::{Node, Plan},
        types::Value,
    },
};

/// Query planner - converts AST into execution plan nodes
pub struct Planner;

impl Planner {
    pub fn new() -> Self {
        Self {}
    }

    /// Builds an execution plan from an AST statement
    pub fn build(&mut self, stmt: ast::Statement) -> Result<Plan> {
        Ok(Plan(self.build_statement(stmt)?))
    }

    pub fn build_statement(&self, stmt: ast::Statement) -> Result<Node> {
        Ok(match stmt {
            ast::Statement::Select {
                select,
                from,
                where_clause,
                group_by,
                having,
                order_by,
                limit,
                offset,
            } => {
                // Build scan node from FROM clause (single table or join result)
                let mut node = self.build_from_item(from)?;

                if let Some(predicate) = where_clause {
                    node = Node::Filter {
                        source: Box::new(node),
                        predicate,
                    }
                }

                let aggregated = group_by.is_some()
                    || having.is_some()
                    || select.iter().any(|(e, _)| e.contains_aggregate())
                    || order_by.iter().any(|(e, _)| e.contains_aggregate());

                let (order_by, select) = if aggregated {
                    if select.is_empty() {
                        return Err(Error::Internal(
                            "SELECT * can not be used with aggregation".into(),
                        ));
                    }
                    // Order keys missing from the select list become hidden
                    // aggregate outputs; the final projection drops them.
                    let mut exprs = select.clone();
                    for (expr, _) in &order_by {
                        if !is_selected(&select, expr) {
                            exprs.push((expr.clone(), None));
                        }
                    }
                    node = Node::Aggregate {
                        source: Box::new(node),
                        group_by,
                        having,
                        exprs,
                    };
                    let select = select
                        .into_iter()
                        .map(|(expr, alias)| match alias {
                            Some(alias) => (Expression::Field(None, alias.clone()), Some(alias)),
                            None => (expr, None),
                        })
                        .collect::<Vec<_>>();
                    (order_by, select)
                } else {
                    (resolve_aliases(order_by, &select), select)
                };

                if !order_by.is_empty() {
                    node = Node::Order {
                        source: Box::new(node),
                        order_by,
                    }
                }

                // OFFSET - must be processed before LIMIT when both are present
                if let Some(expr) = offset {
                    node = Node::Offset {
                        source: Box::new(node),
                        offset: const_usize(expr, "offset")?,
                    }
                }

                if let Some(expr) = limit {
                    node = Node::Limit {
                        source: Box::new(node),
                        limit: const_usize(expr, "limit")?,
                    }
                }

                if !select.is_empty() {
                    node = Node::Projection {
                        source: Box::new(node),
                        exprs: select,
                    }
                }

                node
            }
        })
    }

    fn build_from_item(&self, item: ast::FromItem) -> Result<Node> {
        Ok(match item {
            ast::FromItem::Table { name, alias } => Node::Scan {
                table_name: name,
                alias,
            },
            ast::FromItem::Join {
                left,
                right,
                join_type,
                predicate,
            } => Node::NestedLoopJoin {
                // Recursively build join nodes (base case: single table)
                left: Box::new(self.build_from_item(*left)?),
                right: Box::new(self.build_from_item(*right)?),
                predicate,
                outer: join_type == ast::JoinType::Left,
            },
        })
    }
}

/// Whether an ORDER BY key is already produced by the select list,
/// either as the same expression or by naming one of its aliases
fn is_selected(select: &[(Expression, Option<String>)], expr: &Expression) -> bool {
    select.iter().any(|(e, alias)| {
        e == expr
            || matches!((alias, expr), (Some(a), Expression::Field(None, name)) if a == name)
    })
}

/// Replaces ORDER BY references to select aliases with the aliased expression
fn resolve_aliases(
    order_by: Vec<(Expression, OrderDirection)>,
    select: &[(Expression, Option<String>)],
) -> Vec<(Expression, OrderDirection)> {
    order_by
        .into_iter()
        .map(|(expr, direction)| {
            let aliased = match &expr {
                Expression::Field(None, name) => select
                    .iter()
                    .find(|(_, alias)| alias.as_deref() == Some(name.as_str()))
                    .map(|(e, _)| e.clone()),
                _ => None,
            };
            (aliased.unwrap_or(expr), direction)
        })
        .collect()
}

fn const_usize(expr: Expression, what: &str) -> Result<usize> {
    match Value::from_expression(expr)? {
        Value::Integer(i) if i >= 0 => Ok(i as usize),
        v => Err(Error::Internal(format!("invalid {} {}", what, v))),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::Result,
        sql::{
            parser::{ast::Expression, Parser},
            plan::{Node, Plan},
        },
    };

    fn plan(sql: &str) -> Result<Node> {
        Ok(Plan::build(Parser::new(sql).parse()?)?.0)
    }

    #[test]
    fn test_plan_simple_select() -> Result<()> {
        let node = plan("select company from bars where rating > 3 order by rating desc limit 2")?;
        let Node::Projection { source, exprs } = node else {
            panic!("expected projection, got {:?}", node);
        };
        assert_eq!(exprs, vec![(Expression::field("company"), None)]);
        let Node::Limit { source, limit: 2 } = *source else {
            panic!("expected limit");
        };
        let Node::Order { source, .. } = *source else {
            panic!("expected order");
        };
        assert!(matches!(*source, Node::Filter { .. }));
        Ok(())
    }

    #[test]
    fn test_plan_aggregate_hidden_order_key() -> Result<()> {
        let node = plan(
            "select company, avg(rating) as score from bars group by company \
             order by count(*) desc, score",
        )?;
        let Node::Projection { source, exprs } = node else {
            panic!("expected projection");
        };
        assert_eq!(
            exprs,
            vec![
                (Expression::field("company"), None),
                (Expression::field("score"), Some("score".into())),
            ]
        );
        let Node::Order { source, .. } = *source else {
            panic!("expected order");
        };
        let Node::Aggregate { exprs, group_by, .. } = *source else {
            panic!("expected aggregate");
        };
        assert_eq!(group_by, Some(Expression::field("company")));
        assert_eq!(exprs.len(), 3);
        assert_eq!(exprs[2].0.to_string(), "COUNT(*)");
        Ok(())
    }

    #[test]
    fn test_plan_errors() {
        assert!(plan("select * from bars group by company").is_err());
        assert!(plan("select * from bars limit 'x'").is_err());
    }

    #[test]
    fn test_plan_left_join() -> Result<()> {
        let node =
            plan("select * from bars left join countries as a on bars.companylocationid = a.id")?;
        assert!(matches!(node, Node::NestedLoopJoin { outer: true, .. }));
        Ok(())
    }
}
