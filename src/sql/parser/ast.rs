use std::{cmp::Ordering, fmt::Display};

use crate::{
    error::{Error, Result},
    sql::types::Value,
};

/// Abstract Syntax Tree (AST) node definitions for SQL statements
///
/// `Display` renders a node back into SQL text that the parser accepts, so
/// the command compiler builds queries as ASTs and prints them.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// SELECT statement
    Select {
        /// Column expressions with optional aliases (e.g., Count(*) as cnt)
        select: Vec<(Expression, Option<String>)>,
        from: FromItem,
        where_clause: Option<Expression>,
        /// GROUP BY expression (None with aggregates means one group)
        group_by: Option<Expression>,
        having: Option<Expression>,
        order_by: Vec<(Expression, OrderDirection)>,
        limit: Option<Expression>,
        offset: Option<Expression>,
    },
}

/// FROM clause item - represents a table or join expression
#[derive(Debug, Clone, PartialEq)]
pub enum FromItem {
    /// Single table reference
    Table { name: String, alias: Option<String> },

    /// Join expression (two items joined together)
    Join {
        left: Box<FromItem>,
        right: Box<FromItem>,
        join_type: JoinType,
        /// Join ON condition (None for CROSS JOIN)
        predicate: Option<Expression>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JoinType {
    Cross,
    Inner,
    Left,
}

/// Sort direction (ascending or descending)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// Expression types (column refs, constants, operations, aggregate functions)
#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    /// Column reference, optionally qualified by a table name or alias
    Field(Option<String>, String),
    /// Constant value
    Consts(Consts),
    /// Binary operation
    Operation(Operation),
    /// Aggregate function over an argument, None meaning `*`
    Function(String, Option<Box<Expression>>),
}

impl Expression {
    /// Unqualified column reference
    pub fn field(name: &str) -> Self {
        Expression::Field(None, name.to_string())
    }

    /// Column reference qualified by a table name or alias
    pub fn qualified(table: &str, name: &str) -> Self {
        Expression::Field(Some(table.to_string()), name.to_string())
    }

    pub fn function(name: &str, arg: Expression) -> Self {
        Expression::Function(name.to_string(), Some(Box::new(arg)))
    }

    pub fn equal(self, other: Expression) -> Self {
        Expression::Operation(Operation::Equal(Box::new(self), Box::new(other)))
    }

    pub fn greater_than(self, other: Expression) -> Self {
        Expression::Operation(Operation::GreaterThan(Box::new(self), Box::new(other)))
    }

    /// Whether an aggregate function call appears anywhere in the expression
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expression::Function(_, _) => true,
            Expression::Field(_, _) | Expression::Consts(_) => false,
            Expression::Operation(op) => {
                let (l, r) = op.operands();
                l.contains_aggregate() || r.contains_aggregate()
            }
        }
    }
}

/// Implements From trait to convert Consts into Expression
impl From<Consts> for Expression {
    fn from(value: Consts) -> Self {
        Self::Consts(value)
    }
}

/// Constant values in SQL expressions
#[derive(Debug, PartialEq, Clone)]
pub enum Consts {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// Binary operations
#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    /// Equality comparison (e.g., t1.id = t2.id in JOIN ON clause)
    Equal(Box<Expression>, Box<Expression>),
    GreaterThan(Box<Expression>, Box<Expression>),
    LessThan(Box<Expression>, Box<Expression>),
    And(Box<Expression>, Box<Expression>),
}

impl Operation {
    pub fn operands(&self) -> (&Expression, &Expression) {
        match self {
            Operation::Equal(l, r)
            | Operation::GreaterThan(l, r)
            | Operation::LessThan(l, r)
            | Operation::And(l, r) => (l, r),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Operation::Equal(_, _) => "=",
            Operation::GreaterThan(_, _) => ">",
            Operation::LessThan(_, _) => "<",
            Operation::And(_, _) => "AND",
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statement::Select {
                select,
                from,
                where_clause,
                group_by,
                having,
                order_by,
                limit,
                offset,
            } => {
                write!(f, "SELECT ")?;
                if select.is_empty() {
                    write!(f, "*")?;
                }
                for (i, (expr, alias)) in select.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", expr)?;
                    if let Some(alias) = alias {
                        write!(f, " AS {}", alias)?;
                    }
                }
                write!(f, " FROM {}", from)?;
                if let Some(expr) = where_clause {
                    write!(f, " WHERE {}", expr)?;
                }
                if let Some(expr) = group_by {
                    write!(f, " GROUP BY {}", expr)?;
                }
                if let Some(expr) = having {
                    write!(f, " HAVING {}", expr)?;
                }
                for (i, (expr, direction)) in order_by.iter().enumerate() {
                    f.write_str(if i == 0 { " ORDER BY " } else { ", " })?;
                    write!(f, "{} {}", expr, direction)?;
                }
                if let Some(expr) = limit {
                    write!(f, " LIMIT {}", expr)?;
                }
                if let Some(expr) = offset {
                    write!(f, " OFFSET {}", expr)?;
                }
                Ok(())
            }
        }
    }
}

impl Display for FromItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FromItem::Table { name, alias: None } => write!(f, "{}", name),
            FromItem::Table { name, alias: Some(alias) } => write!(f, "{} AS {}", name, alias),
            FromItem::Join {
                left,
                right,
                join_type,
                predicate,
            } => {
                write!(f, "{} {} {}", left, join_type, right)?;
                if let Some(expr) = predicate {
                    write!(f, " ON {}", expr)?;
                }
                Ok(())
            }
        }
    }
}

impl Display for JoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            JoinType::Cross => "CROSS JOIN",
            JoinType::Inner => "JOIN",
            JoinType::Left => "LEFT JOIN",
        })
    }
}

impl Display for OrderDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        })
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Field(None, name) => write!(f, "{}", name),
            Expression::Field(Some(table), name) => write!(f, "{}.{}", table, name),
            Expression::Consts(c) => write!(f, "{}", c),
            Expression::Operation(op) => {
                let (l, r) = op.operands();
                write!(f, "{} {} {}", l, op.symbol(), r)
            }
            Expression::Function(name, None) => write!(f, "{}(*)", name.to_uppercase()),
            Expression::Function(name, Some(arg)) => {
                write!(f, "{}({})", name.to_uppercase(), arg)
            }
        }
    }
}

impl Display for Consts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Consts::Null => write!(f, "NULL"),
            Consts::Boolean(true) => write!(f, "TRUE"),
            Consts::Boolean(false) => write!(f, "FALSE"),
            Consts::Integer(i) => write!(f, "{}", i),
            // Debug keeps the decimal point so the literal lexes back as a float
            Consts::Float(v) => write!(f, "{:?}", v),
            Consts::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

/// Finds the position of a column label matching the expression.
///
/// Labels are `alias.column` after a scan and the expression text (or its
/// alias) after projection and aggregation. A bare column name also matches
/// a unique `*.name` label.
pub fn resolve_column(expr: &Expression, cols: &[String]) -> Result<Option<usize>> {
    let text = expr.to_string();
    if let Some(pos) = cols.iter().position(|c| c.eq_ignore_ascii_case(&text)) {
        return Ok(Some(pos));
    }
    let Expression::Field(None, name) = expr else {
        return Ok(None);
    };
    let suffix = format!(".{}", name.to_lowercase());
    let mut matches = cols
        .iter()
        .enumerate()
        .filter(|(_, c)| c.to_lowercase().ends_with(&suffix));
    match (matches.next(), matches.next()) {
        (Some((pos, _)), None) => Ok(Some(pos)),
        (Some(_), Some(_)) => Err(Error::Internal(format!("column {} is ambiguous", name))),
        (None, _) => Ok(None),
    }
}

/// Evaluates an expression against a single row
pub fn evaluate_expr(expr: &Expression, cols: &[String], row: &[Value]) -> Result<Value> {
    if matches!(expr, Expression::Field(_, _) | Expression::Function(_, _)) {
        if let Some(pos) = resolve_column(expr, cols)? {
            return Ok(row[pos].clone());
        }
    }
    match expr {
        Expression::Field(_, _) => Err(Error::Internal(format!("column {} not found", expr))),
        Expression::Function(_, _) => Err(Error::Internal(format!(
            "aggregate {} is not allowed here",
            expr
        ))),
        Expression::Consts(c) => Value::from_expression(Expression::Consts(c.clone())),
        Expression::Operation(op) => {
            let (l, r) = op.operands();
            let lv = evaluate_expr(l, cols, row)?;
            let rv = evaluate_expr(r, cols, row)?;
            apply_operation(op, lv, rv)
        }
    }
}

/// Combines two evaluated operands; comparisons with NULL yield NULL
pub fn apply_operation(op: &Operation, lv: Value, rv: Value) -> Result<Value> {
    Ok(match op {
        Operation::Equal(_, _) => match lv.compare(&rv)? {
            Some(o) => Value::Boolean(o == Ordering::Equal),
            None => Value::Null,
        },
        Operation::GreaterThan(_, _) => match lv.compare(&rv)? {
            Some(o) => Value::Boolean(o == Ordering::Greater),
            None => Value::Null,
        },
        Operation::LessThan(_, _) => match lv.compare(&rv)? {
            Some(o) => Value::Boolean(o == Ordering::Less),
            None => Value::Null,
        },
        Operation::And(_, _) => match (lv, rv) {
            (Value::Boolean(false), _) | (_, Value::Boolean(false)) => Value::Boolean(false),
            (Value::Boolean(true), Value::Boolean(true)) => Value::Boolean(true),
            (Value::Null, _) | (_, Value::Null) => Value::Null,
            (l, r) => {
                return Err(Error::Internal(format!("can not apply AND to {} and {}", l, r)))
            }
        },
    })
}
