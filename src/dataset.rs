//! Loads the chocolate bar dataset from CSV files into a SQL engine

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::Result,
    sql::{
        engine::{Engine, Transaction},
        schema::{Column, Table},
        types::{DataType, Value},
    },
};

pub const BARS_FILE: &str = "bars.csv";
pub const COUNTRIES_FILE: &str = "countries.csv";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CountryRecord {
    id: i64,
    alpha2: String,
    english_name: String,
    region: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BarRecord {
    id: i64,
    company: String,
    specific_bean_bar_name: String,
    cocoa_percent: f64,
    company_location_id: Option<i64>,
    rating: f64,
    broad_bean_origin_id: Option<i64>,
}

fn countries_table() -> Table {
    Table {
        name: "countries".into(),
        columns: vec![
            Column::new("Id", DataType::Integer).primary_key(),
            Column::new("Alpha2", DataType::String),
            Column::new("EnglishName", DataType::String),
            Column::new("Region", DataType::String),
        ],
    }
}

fn bars_table() -> Table {
    Table {
        name: "bars".into(),
        columns: vec![
            Column::new("Id", DataType::Integer).primary_key(),
            Column::new("Company", DataType::String),
            Column::new("SpecificBeanBarName", DataType::String),
            Column::new("CocoaPercent", DataType::Float),
            Column::new("CompanyLocationId", DataType::Integer).nullable(),
            Column::new("Rating", DataType::Float),
            Column::new("BroadBeanOriginId", DataType::Integer).nullable(),
        ],
    }
}

fn optional(id: Option<i64>) -> Value {
    id.map_or(Value::Null, Value::Integer)
}

/// Creates the `Countries` and `Bars` tables and fills them from
/// `countries.csv` and `bars.csv` in `dir`.
///
/// Everything happens in one transaction: a missing or malformed file
/// leaves the engine untouched.
pub fn load<E: Engine>(engine: &E, dir: &Path) -> Result<()> {
    let mut txn = engine.begin()?;
    match load_into(&mut txn, dir) {
        Ok((countries, bars)) => {
            txn.commit()?;
            info!(countries, bars, dir = %dir.display(), "dataset loaded");
            Ok(())
        }
        Err(err) => {
            warn!(%err, dir = %dir.display(), "dataset load failed, rolling back");
            txn.rollback()?;
            Err(err)
        }
    }
}

fn load_into<T: Transaction>(txn: &mut T, dir: &Path) -> Result<(usize, usize)> {
    txn.create_table(countries_table())?;
    txn.create_table(bars_table())?;

    let mut countries = 0;
    let mut reader = csv::Reader::from_path(dir.join(COUNTRIES_FILE))?;
    for record in reader.deserialize() {
        let c: CountryRecord = record?;
        txn.create_row(
            "countries",
            vec![
                Value::Integer(c.id),
                Value::String(c.alpha2),
                Value::String(c.english_name),
                Value::String(c.region),
            ],
        )?;
        countries += 1;
    }

    let mut bars = 0;
    let mut reader = csv::Reader::from_path(dir.join(BARS_FILE))?;
    for record in reader.deserialize() {
        let b: BarRecord = record?;
        txn.create_row(
            "bars",
            vec![
                Value::Integer(b.id),
                Value::String(b.company),
                Value::String(b.specific_bean_bar_name),
                Value::Float(b.cocoa_percent),
                optional(b.company_location_id),
                Value::Float(b.rating),
                optional(b.broad_bean_origin_id),
            ],
        )?;
        bars += 1;
    }

    Ok((countries, bars))
}
