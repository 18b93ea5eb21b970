//! Tabular query results.
//!
//! Every warehouse statement, declarative query or administrative command,
//! ends up as a [`QueryResult`]: named, typed columns over row-major cells.
//! A result lives for one render pass and is never cached.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Semantic type declared for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Timestamp,
}

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Numeric view of the cell.
    ///
    /// Text cells are parsed, since administrative commands report counts
    /// as strings. Returns `None` for nulls, timestamps and non-numeric text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(v) => Some(*v as f64),
            CellValue::Float(v) => Some(*v),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Null | CellValue::Timestamp(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Ordering used by severity sorts: numbers compare numerically,
    /// timestamps chronologically, text lexically, and nulls sort below
    /// everything else.
    pub fn severity_cmp(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Null, CellValue::Null) => Ordering::Equal,
            (CellValue::Null, _) => Ordering::Less,
            (_, CellValue::Null) => Ordering::Greater,
            (CellValue::Timestamp(a), CellValue::Timestamp(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => a.display().cmp(&b.display()),
            },
        }
    }

    /// Text shown in a table cell.
    pub fn display(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Integer(v) => v.to_string(),
            CellValue::Float(v) => format_float(*v),
            CellValue::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        let rounded = format!("{:.4}", value);
        rounded
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Null)
    }
}

/// Column descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Materialized result of one statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    columns: Vec<Column>,
    rows: Vec<Vec<CellValue>>,
}

impl QueryResult {
    /// Builds a result, padding or truncating each row to the column count.
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Builds a result from cursor column names, inferring each column's
    /// type from the cells it holds.
    pub fn from_named_rows(names: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                let column_type = infer_type(rows.iter().filter_map(|row| row.get(idx)));
                Column::new(name, column_type)
            })
            .collect();
        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive column lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// All values of one column, top to bottom.
    pub fn column_values(&self, name: &str) -> Option<Vec<&CellValue>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    pub(crate) fn into_parts(self) -> (Vec<Column>, Vec<Vec<CellValue>>) {
        (self.columns, self.rows)
    }
}

fn infer_type<'a>(cells: impl Iterator<Item = &'a CellValue>) -> ColumnType {
    let mut inferred = None;
    for cell in cells {
        let kind = match cell {
            CellValue::Null => continue,
            CellValue::Text(_) => ColumnType::Text,
            CellValue::Integer(_) => ColumnType::Integer,
            CellValue::Float(_) => ColumnType::Float,
            CellValue::Timestamp(_) => ColumnType::Timestamp,
        };
        inferred = match (inferred, kind) {
            (None, k) => Some(k),
            (Some(ColumnType::Integer), ColumnType::Float)
            | (Some(ColumnType::Float), ColumnType::Integer) => Some(ColumnType::Float),
            (Some(prev), k) if prev == k => Some(prev),
            _ => return ColumnType::Text,
        };
    }
    inferred.unwrap_or(ColumnType::Text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pads_short_rows_with_nulls() {
        let result = QueryResult::new(
            vec![
                Column::new("A", ColumnType::Text),
                Column::new("B", ColumnType::Integer),
            ],
            vec![vec!["x".into()]],
        );
        assert_eq!(result.rows()[0], vec![CellValue::from("x"), CellValue::Null]);
    }

    #[test]
    fn column_lookup_ignores_case() {
        let result = QueryResult::new(vec![Column::new("WAREHOUSE_NAME", ColumnType::Text)], vec![]);
        assert_eq!(result.column_index("warehouse_name"), Some(0));
        assert_eq!(result.column_index("missing"), None);
    }

    #[test]
    fn from_named_rows_infers_types() {
        let result = QueryResult::from_named_rows(
            vec!["name".into(), "running".into(), "load".into(), "empty".into()],
            vec![
                vec!["WH1".into(), 2i64.into(), 1i64.into(), CellValue::Null],
                vec!["WH2".into(), 0i64.into(), 0.5f64.into(), CellValue::Null],
            ],
        );
        let types: Vec<_> = result.columns().iter().map(|c| c.column_type).collect();
        assert_eq!(
            types,
            vec![ColumnType::Text, ColumnType::Integer, ColumnType::Float, ColumnType::Text]
        );
    }

    #[test]
    fn as_f64_parses_numeric_text() {
        assert_eq!(CellValue::from("10").as_f64(), Some(10.0));
        assert_eq!(CellValue::from("STANDARD").as_f64(), None);
        assert_eq!(CellValue::Null.as_f64(), None);
    }

    #[test]
    fn severity_cmp_puts_nulls_lowest() {
        assert_eq!(CellValue::Null.severity_cmp(&CellValue::Integer(0)), Ordering::Less);
        assert_eq!(
            CellValue::Integer(2).severity_cmp(&CellValue::Float(1.5)),
            Ordering::Greater
        );
        assert_eq!(CellValue::from("10").severity_cmp(&CellValue::from("9")), Ordering::Greater);
    }

    #[test]
    fn display_formats_floats() {
        assert_eq!(CellValue::Float(1.0).display(), "1.0");
        assert_eq!(CellValue::Float(0.123456).display(), "0.1235");
        assert_eq!(CellValue::Float(2.5).display(), "2.5");
        assert_eq!(CellValue::Null.display(), "");
    }
}
