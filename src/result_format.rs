/// Presentation formatting for result sets
/// Sales figures are rounded to two decimals here, never in storage
use crate::query::result::ResultSet;
use crate::storage::value::Value;
use serde::{Deserialize, Serialize};

/// How many rows to present
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultFormat {
    /// All rows - default
    #[default]
    Full,
    /// First N rows plus a summary line (oracle payloads)
    Sample(usize),
}

/// Result ready for the response or an oracle payload
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FormattedResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    /// Total row count before sampling
    pub row_count: usize,
    pub summary: Option<String>,
}

/// Sales columns are monetary (millions of units)
pub fn is_sales_column(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with("_sales")
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// JSON form of one cell
pub fn present_value(column: &str, value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Int64(i) => serde_json::Value::from(*i),
        Value::Float64(f) if is_sales_column(column) => serde_json::Value::from(round2(*f)),
        Value::Float64(f) => serde_json::Value::from(*f),
        Value::String(s) => serde_json::Value::from(s.as_str()),
        Value::Bool(b) => serde_json::Value::from(*b),
    }
}

fn present_row(columns: &[String], row: &[Value]) -> Vec<serde_json::Value> {
    columns.iter().zip(row).map(|(c, v)| present_value(c, v)).collect()
}

pub fn format_results(result: &ResultSet, format: ResultFormat) -> FormattedResult {
    match format {
        ResultFormat::Full => FormattedResult {
            columns: result.columns.clone(),
            rows: result.rows.iter().map(|r| present_row(&result.columns, r)).collect(),
            row_count: result.len(),
            summary: None,
        },
        ResultFormat::Sample(n) => FormattedResult {
            columns: result.columns.clone(),
            rows: result
                .rows
                .iter()
                .take(n)
                .map(|r| present_row(&result.columns, r))
                .collect(),
            row_count: result.len(),
            summary: Some(generate_summary(result)),
        },
    }
}

/// One line describing shape and numeric ranges
fn generate_summary(result: &ResultSet) -> String {
    if result.is_empty() {
        return format!("Query returned 0 rows. Columns: [{}]", result.columns.join(", "));
    }

    let mut stats = Vec::new();
    for (idx, name) in result.columns.iter().enumerate() {
        let values: Vec<f64> = result
            .rows
            .iter()
            .filter_map(|r| r.get(idx))
            .filter(|v| matches!(v, Value::Float64(_) | Value::Int64(_)))
            .filter_map(Value::as_f64)
            .collect();
        if values.is_empty() {
            continue;
        }
        let min = values.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        stats.push(format!("{}: min={:.2}, max={:.2}", name, min, max));
    }

    let stats_text = if stats.is_empty() {
        String::new()
    } else {
        format!(" Statistics: {}", stats.join("; "))
    };
    format!(
        "Query returned {} rows, {} columns: [{}].{}",
        result.len(),
        result.columns.len(),
        result.columns.join(", "),
        stats_text
    )
}
