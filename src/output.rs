//! Result rendering: tables for the prompt and a text bar chart

use tabled::{builder::Builder, settings::Style};

use crate::{
    error::{Error, Result},
    sql::{executor::ResultSet, types::Value},
};

/// Longest text shown in a table cell before it is cut off
pub const MAX_TEXT_WIDTH: usize = 12;
/// Width of the longest bar in a chart
pub const CHART_WIDTH: usize = 40;

/// Format a query result as a table with one line per row.
pub fn format_result(result: &ResultSet) -> String {
    let mut builder = Builder::new();
    builder.push_record(result.columns.iter().cloned());
    for row in &result.rows {
        builder.push_record(
            result
                .columns
                .iter()
                .zip(row)
                .map(|(label, value)| format_value(label, value)),
        );
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    format!("{table}\n({} rows)", result.len())
}

/// Format a single cell of the column labelled `label`.
pub fn format_value(label: &str, value: &Value) -> String {
    match value {
        Value::String(s) => truncate(s),
        Value::Float(f) if is_percent(label) => format!("{:.0}%", f * 100.0),
        Value::Float(f) => format!("{f:.1}"),
        v => v.to_string(),
    }
}

fn is_percent(label: &str) -> bool {
    label.to_lowercase().contains("cocoapercent")
}

fn truncate(s: &str) -> String {
    if s.chars().count() > MAX_TEXT_WIDTH {
        format!("{}...", s.chars().take(MAX_TEXT_WIDTH).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Draws a horizontal bar chart: labels from the first column, bar lengths
/// from `column`, scaled so the largest value spans [`CHART_WIDTH`].
/// NULL values draw as empty bars.
pub fn barplot(result: &ResultSet, column: usize) -> Result<String> {
    let Some(label) = result.columns.get(column) else {
        return Err(Error::Internal(format!("no column {} to plot", column)));
    };

    let mut bars = Vec::with_capacity(result.len());
    for row in &result.rows {
        let value = match &row[column] {
            Value::Null => 0.0,
            v => v.as_f64().ok_or_else(|| {
                Error::Internal(format!("can not plot non-numeric value {}", v))
            })?,
        };
        bars.push((truncate(&row[0].to_string()), format_value(label, &row[column]), value));
    }

    let max = bars.iter().map(|(_, _, v)| *v).fold(0.0, f64::max);
    let name_width = bars.iter().map(|(n, _, _)| n.chars().count()).max().unwrap_or(0);

    let mut out = String::new();
    for (name, shown, value) in bars {
        let len = if max > 0.0 {
            (value.max(0.0) / max * CHART_WIDTH as f64).round() as usize
        } else {
            0
        };
        out.push_str(&format!("{name:<name_width$} |{} {shown}\n", "#".repeat(len)));
    }
    Ok(out)
}
