use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    sql::types::{DataType, Row, Value},
};

/// Table schema definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    /// Validates table schema
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::Internal(format!(
                "table {} has no columns",
                self.name
            )));
        }

        match self.columns.iter().filter(|c| c.primary_key).count() {
            1 => {}
            0 => {
                return Err(Error::Internal(format!(
                    "No primary key for table {}",
                    self.name
                )))
            }
            _ => {
                return Err(Error::Internal(format!(
                    "Multiple primary keys for table {}",
                    self.name
                )))
            }
        }

        Ok(())
    }

    /// Checks a row against the column count, nullability and types
    pub fn validate_row(&self, row: &Row) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::Internal(format!(
                "table {} expects {} values, got {}",
                self.name,
                self.columns.len(),
                row.len()
            )));
        }
        for (col, value) in self.columns.iter().zip(row) {
            match value.datatype() {
                None if col.nullable => {}
                None => {
                    return Err(Error::Internal(format!(
                        "column {} cannot be null",
                        col.name
                    )))
                }
                Some(dt) if dt != col.datatype => {
                    return Err(Error::Internal(format!(
                        "column {} type mismatch",
                        col.name
                    )))
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Extracts primary key value from a row
    pub fn get_primary_key(&self, row: &Row) -> Result<Value> {
        let pos = self
            .columns
            .iter()
            .position(|c| c.primary_key)
            .ok_or_else(|| Error::Internal(format!("No primary key for table {}", self.name)))?;
        Ok(row[pos].clone())
    }
}

/// Column schema definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub datatype: DataType,
    pub nullable: bool,
    /// Whether this column is the primary key
    pub primary_key: bool,
}

impl Column {
    pub fn new(name: &str, datatype: DataType) -> Self {
        Self {
            name: name.to_lowercase(),
            datatype,
            nullable: false,
            primary_key: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{Column, Table};
    use crate::{
        error::Result,
        sql::types::{DataType, Value},
    };

    fn countries() -> Table {
        Table {
            name: "countries".into(),
            columns: vec![
                Column::new("Id", DataType::Integer).primary_key(),
                Column::new("Alpha2", DataType::String),
                Column::new("Region", DataType::String).nullable(),
            ],
        }
    }

    #[test]
    fn test_validate() -> Result<()> {
        countries().validate()?;

        let no_pk = Table {
            name: "t".into(),
            columns: vec![Column::new("a", DataType::Integer)],
        };
        assert!(no_pk.validate().is_err());
        assert!(Table { name: "t".into(), columns: vec![] }.validate().is_err());
        Ok(())
    }

    #[test]
    fn test_validate_row() -> Result<()> {
        let table = countries();
        table.validate_row(&vec![
            Value::Integer(1),
            Value::String("BR".into()),
            Value::Null,
        ])?;
        assert!(table
            .validate_row(&vec![Value::Integer(1), Value::Null, Value::Null])
            .is_err());
        assert!(table
            .validate_row(&vec![Value::String("1".into()), Value::String("BR".into()), Value::Null])
            .is_err());
        assert!(table.validate_row(&vec![Value::Integer(1)]).is_err());
        assert_eq!(
            table.get_primary_key(&vec![Value::Integer(7), Value::Null, Value::Null])?,
            Value::Integer(7)
        );
        Ok(())
    }
}
