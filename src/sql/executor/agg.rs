use std::collections::HashMap;

use crate::{
    error::{Error, Result},
    sql::{
        engine::Transaction,
        parser::ast::{apply_operation, evaluate_expr, resolve_column, Expression},
        types::{Row, Value},
    },
};

use super::{Executor, ResultSet};

/// Aggregate executor - groups rows, filters groups with HAVING and
/// computes aggregate functions (COUNT, SUM, MIN, MAX, AVG) per group
pub struct Aggregate<T: Transaction> {
    source: Box<dyn Executor<T>>,
    group_by: Option<Expression>,
    having: Option<Expression>,
    exprs: Vec<(Expression, Option<String>)>,
}

impl<T: Transaction> Aggregate<T> {
    pub fn new(
        source: Box<dyn Executor<T>>,
        group_by: Option<Expression>,
        having: Option<Expression>,
        exprs: Vec<(Expression, Option<String>)>,
    ) -> Box<Self> {
        Box::new(Self {
            source,
            group_by,
            having,
            exprs,
        })
    }
}

impl<T: Transaction> Executor<T> for Aggregate<T> {
    fn execute(self: Box<Self>, txn: &mut T) -> Result<ResultSet> {
        let Self {
            source,
            group_by,
            having,
            exprs,
        } = *self;
        let ResultSet { columns, rows } = source.execute(txn)?;

        let mut new_rows = Vec::new();
        for group in group_rows(group_by.as_ref(), &columns, rows)? {
            if let Some(having) = &having {
                match evaluate_group_expr(having, &columns, &group)? {
                    Value::Boolean(true) => {}
                    Value::Boolean(false) | Value::Null => continue,
                    v => {
                        return Err(Error::Internal(format!(
                            "having {} evaluated to non-boolean {}",
                            having, v
                        )))
                    }
                }
            }
            new_rows.push(
                exprs
                    .iter()
                    .map(|(expr, _)| evaluate_group_expr(expr, &columns, &group))
                    .collect::<Result<Vec<_>>>()?,
            );
        }

        // Use alias if provided, otherwise the expression text
        // e.g., avg(rating) -> "AVG(rating)", avg(rating) as score -> "score"
        Ok(ResultSet {
            columns: exprs
                .into_iter()
                .map(|(expr, alias)| alias.unwrap_or_else(|| expr.to_string()))
                .collect(),
            rows: new_rows,
        })
    }
}

/// Splits rows into groups, keeping groups in first-seen order.
///
/// Without GROUP BY the whole input is a single group, even when empty.
fn group_rows(
    group_by: Option<&Expression>,
    columns: &[String],
    rows: Vec<Row>,
) -> Result<Vec<Vec<Row>>> {
    let Some(group_by) = group_by else {
        return Ok(vec![rows]);
    };
    let mut index: HashMap<Vec<u8>, usize> = HashMap::new();
    let mut groups: Vec<Vec<Row>> = Vec::new();
    for row in rows {
        // Values are not hashable (floats), their encoding is
        let key = bincode::serialize(&evaluate_expr(group_by, columns, &row)?)?;
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(row);
    }
    Ok(groups)
}

/// Evaluates an expression over a group of rows.
///
/// Aggregate calls consume the whole group; bare columns take their value
/// from the first row of the group (NULL for an empty group).
pub fn evaluate_group_expr(expr: &Expression, cols: &[String], rows: &[Row]) -> Result<Value> {
    match expr {
        Expression::Function(name, arg) => {
            let values = match arg {
                // COUNT(*) counts rows, so every row contributes a non-null value
                None => vec![Value::Integer(1); rows.len()],
                Some(arg) => rows
                    .iter()
                    .map(|row| evaluate_expr(arg, cols, row))
                    .collect::<Result<Vec<_>>>()?,
            };
            <dyn Calculator>::build(name)?.calc(&values)
        }
        Expression::Operation(op) => {
            let (l, r) = op.operands();
            let lv = evaluate_group_expr(l, cols, rows)?;
            let rv = evaluate_group_expr(r, cols, rows)?;
            apply_operation(op, lv, rv)
        }
        Expression::Consts(_) => evaluate_expr(expr, cols, &[]),
        Expression::Field(_, _) => match rows.first() {
            Some(row) => evaluate_expr(expr, cols, row),
            None => match resolve_column(expr, cols)? {
                Some(_) => Ok(Value::Null),
                None => Err(Error::Internal(format!("column {} not found", expr))),
            },
        },
    }
}

/// Trait for aggregate function calculations over the non-null inputs
pub trait Calculator {
    fn calc(&self, values: &[Value]) -> Result<Value>;
}

impl dyn Calculator {
    /// Runtime dispatch to appropriate calculator based on function name
    pub fn build(func_name: &str) -> Result<Box<dyn Calculator>> {
        Ok(match func_name.to_uppercase().as_ref() {
            "COUNT" => Box::new(Count),
            "SUM" => Box::new(Sum),
            "MIN" => Box::new(Min),
            "MAX" => Box::new(Max),
            "AVG" => Box::new(Avg),
            _ => {
                return Err(Error::Internal(format!(
                    "unknown aggregate function {}",
                    func_name
                )))
            }
        })
    }
}

fn non_null(values: &[Value]) -> impl Iterator<Item = &Value> {
    values.iter().filter(|v| **v != Value::Null)
}

/// COUNT - counts non-null values
pub struct Count;

impl Calculator for Count {
    fn calc(&self, values: &[Value]) -> Result<Value> {
        Ok(Value::Integer(non_null(values).count() as i64))
    }
}

/// MIN - finds minimum value
pub struct Min;

impl Calculator for Min {
    fn calc(&self, values: &[Value]) -> Result<Value> {
        Ok(non_null(values)
            .fold(None::<&Value>, |min, v| match min {
                Some(m) if m <= v => Some(m),
                _ => Some(v),
            })
            .cloned()
            .unwrap_or(Value::Null))
    }
}

/// MAX - finds maximum value
pub struct Max;

impl Calculator for Max {
    fn calc(&self, values: &[Value]) -> Result<Value> {
        Ok(non_null(values)
            .fold(None::<&Value>, |max, v| match max {
                Some(m) if m >= v => Some(m),
                _ => Some(v),
            })
            .cloned()
            .unwrap_or(Value::Null))
    }
}

/// SUM - calculates sum of numeric values
pub struct Sum;

impl Calculator for Sum {
    fn calc(&self, values: &[Value]) -> Result<Value> {
        let mut sum = None;
        for v in non_null(values) {
            match v.as_f64() {
                Some(n) => sum = Some(sum.unwrap_or(0.0) + n),
                None => return Err(Error::Internal(format!("can not sum value {}", v))),
            }
        }
        Ok(sum.map_or(Value::Null, Value::Float))
    }
}

/// AVG - calculates average of numeric values
pub struct Avg;

impl Calculator for Avg {
    fn calc(&self, values: &[Value]) -> Result<Value> {
        // AVG = SUM / COUNT
        let sum = Sum.calc(values)?;
        let count = Count.calc(values)?;
        Ok(match (sum, count) {
            (Value::Float(s), Value::Integer(c)) if c > 0 => Value::Float(s / c as f64),
            _ => Value::Null,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Calculator, evaluate_group_expr, group_rows};
    use crate::{
        error::Result,
        sql::{
            parser::ast::{Consts, Expression},
            types::Value,
        },
    };

    #[test]
    fn test_calculators() -> Result<()> {
        let values = vec![Value::Float(3.0), Value::Null, Value::Integer(4), Value::Float(2.0)];
        assert_eq!(<dyn Calculator>::build("count")?.calc(&values)?, Value::Integer(3));
        assert_eq!(<dyn Calculator>::build("SUM")?.calc(&values)?, Value::Float(9.0));
        assert_eq!(<dyn Calculator>::build("avg")?.calc(&values)?, Value::Float(3.0));
        assert_eq!(<dyn Calculator>::build("min")?.calc(&values)?, Value::Float(2.0));
        assert_eq!(<dyn Calculator>::build("max")?.calc(&values)?, Value::Integer(4));
        assert_eq!(<dyn Calculator>::build("avg")?.calc(&[Value::Null])?, Value::Null);
        assert!(<dyn Calculator>::build("median").is_err());
        assert!(<dyn Calculator>::build("sum")?.calc(&[Value::String("x".into())]).is_err());
        Ok(())
    }

    #[test]
    fn test_group_expr() -> Result<()> {
        let cols = vec!["bars.company".to_string(), "bars.rating".to_string()];
        let rows = vec![
            vec![Value::String("Amedei".into()), Value::Float(4.0)],
            vec![Value::String("Amedei".into()), Value::Float(3.0)],
        ];
        let having =
            Expression::Function("count".into(), None).greater_than(Consts::Integer(1).into());
        assert_eq!(evaluate_group_expr(&having, &cols, &rows)?, Value::Boolean(true));
        assert_eq!(
            evaluate_group_expr(&Expression::field("company"), &cols, &rows)?,
            Value::String("Amedei".into())
        );
        assert_eq!(
            evaluate_group_expr(
                &Expression::function("avg", Expression::field("rating")),
                &cols,
                &rows
            )?,
            Value::Float(3.5)
        );
        assert_eq!(evaluate_group_expr(&Expression::field("company"), &cols, &[])?, Value::Null);
        Ok(())
    }

    #[test]
    fn test_group_rows() -> Result<()> {
        let cols = vec!["bars.company".to_string(), "bars.rating".to_string()];
        let row = |company: Option<&str>, rating: f64| {
            vec![company.map_or(Value::Null, |c| Value::String(c.into())), Value::Float(rating)]
        };
        let rows = vec![
            row(Some("Soma"), 3.5),
            row(None, 2.0),
            row(Some("Amedei"), 4.0),
            row(Some("Soma"), 3.0),
            row(None, 2.5),
        ];

        let groups = group_rows(Some(&Expression::field("company")), &cols, rows.clone())?;
        assert_eq!(
            groups,
            vec![
                vec![rows[0].clone(), rows[3].clone()],
                vec![rows[1].clone(), rows[4].clone()],
                vec![rows[2].clone()],
            ]
        );

        assert_eq!(group_rows(None, &cols, rows.clone())?, vec![rows]);
        assert_eq!(group_rows(None, &cols, Vec::new())?, vec![Vec::<Vec<Value>>::new()]);
        assert!(group_rows(Some(&Expression::field("company")), &cols, Vec::new())?.is_empty());
        Ok(())
    }
}
