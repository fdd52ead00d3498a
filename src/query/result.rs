//! Tabular query results

use crate::storage::value::Value;
use serde::{Deserialize, Serialize};

/// Ordered columns and rows produced by the executor
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive column lookup
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// First non-null value of a column
    pub fn first_value(&self, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.iter().filter_map(|r| r.get(idx)).find(|v| !v.is_null())
    }

    /// All values of a column, in row order
    pub fn column_values(&self, column: &str) -> Vec<&Value> {
        match self.column_index(column) {
            Some(idx) => self.rows.iter().filter_map(|r| r.get(idx)).collect(),
            None => Vec::new(),
        }
    }

    /// Rows as JSON objects keyed by column name
    pub fn to_records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().map(|v| serde_json::to_value(v).unwrap_or(serde_json::Value::Null)))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_column_name() {
        let rs = ResultSet::new(
            vec!["Name".into(), "Global_Sales".into()],
            vec![
                vec![Value::String("Wii Sports".into()), Value::Float64(82.53)],
                vec![Value::String("Tetris".into()), Value::Null],
            ],
        );
        assert_eq!(rs.value(0, "global_sales"), Some(&Value::Float64(82.53)));
        assert_eq!(rs.value(5, "Name"), None);
        assert_eq!(rs.first_value("Global_Sales"), Some(&Value::Float64(82.53)));
        assert_eq!(rs.column_values("Name").len(), 2);
        let records = rs.to_records();
        assert_eq!(records[1]["Global_Sales"], serde_json::Value::Null);
        assert_eq!(records[0]["Name"], serde_json::json!("Wii Sports"));
    }
}
