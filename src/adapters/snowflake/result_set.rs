//! SQL API response bodies and their conversion into typed tables.

use chrono::DateTime;
use serde::Deserialize;

use crate::domain::monitoring::{CellValue, Column, ColumnType, QueryResult};

/// Body of a statement submission, status poll or partition fetch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatementResponse {
    #[serde(default)]
    pub statement_handle: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result_set_meta_data: Option<ResultSetMetaData>,
    #[serde(default)]
    pub data: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResultSetMetaData {
    #[serde(default)]
    pub row_type: Vec<RowType>,
    #[serde(default)]
    pub partition_info: Vec<PartitionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RowType {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub scale: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PartitionInfo {
    #[serde(default)]
    pub row_count: Option<u64>,
}

impl StatementResponse {
    /// Number of result partitions; the first one arrives with the response.
    pub fn partition_count(&self) -> usize {
        self.result_set_meta_data
            .as_ref()
            .map(|m| m.partition_info.len())
            .unwrap_or(0)
            .max(1)
    }

    pub fn columns(&self) -> Vec<Column> {
        self.result_set_meta_data
            .as_ref()
            .map(|m| {
                m.row_type
                    .iter()
                    .map(|r| Column::new(r.name.clone(), column_type(r)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Maps a SQL API column type onto a table column type.
pub(crate) fn column_type(row_type: &RowType) -> ColumnType {
    let name = row_type.type_name.to_ascii_lowercase();
    match name.as_str() {
        "fixed" if row_type.scale.unwrap_or(0) == 0 => ColumnType::Integer,
        "fixed" | "real" => ColumnType::Float,
        t if t.starts_with("timestamp") => ColumnType::Timestamp,
        _ => ColumnType::Text,
    }
}

/// Converts one wire cell. Values that do not parse as their declared
/// type are kept as text.
pub(crate) fn parse_cell(raw: Option<&str>, column_type: ColumnType) -> CellValue {
    let Some(raw) = raw else {
        return CellValue::Null;
    };
    match column_type {
        ColumnType::Integer => raw
            .parse::<i64>()
            .map(CellValue::Integer)
            .or_else(|_| raw.parse::<f64>().map(CellValue::Float))
            .unwrap_or_else(|_| CellValue::from(raw)),
        ColumnType::Float => raw
            .parse::<f64>()
            .map(CellValue::Float)
            .unwrap_or_else(|_| CellValue::from(raw)),
        ColumnType::Timestamp => parse_epoch(raw)
            .map(CellValue::Timestamp)
            .unwrap_or_else(|| CellValue::from(raw)),
        ColumnType::Text => CellValue::from(raw),
    }
}

/// Parses `seconds[.fraction][ tz-offset]`.
fn parse_epoch(raw: &str) -> Option<DateTime<chrono::Utc>> {
    let epoch = raw.split_whitespace().next()?;
    let (secs, fraction) = match epoch.split_once('.') {
        Some((secs, fraction)) => (secs, fraction),
        None => (epoch, ""),
    };
    let negative = secs.starts_with('-');
    let whole: i64 = secs.parse().ok()?;
    let fraction_nanos = if fraction.is_empty() {
        0
    } else {
        let digits: String = fraction.chars().take(9).collect();
        let padded = format!("{:0<9}", digits);
        padded.parse::<u32>().ok()?
    };
    // The fraction shares the sign of the whole value; chrono wants
    // non-negative nanos, so borrow a second for negative epochs.
    let (secs, nanos) = if negative && fraction_nanos > 0 {
        (whole.checked_sub(1)?, 1_000_000_000 - fraction_nanos)
    } else {
        (whole, fraction_nanos)
    };
    DateTime::from_timestamp(secs, nanos)
}

pub(crate) fn parse_rows(columns: &[Column], data: &[Vec<Option<String>>]) -> Vec<Vec<CellValue>> {
    data.iter()
        .map(|row| {
            columns
                .iter()
                .enumerate()
                .map(|(i, column)| {
                    let raw = row.get(i).and_then(|cell| cell.as_deref());
                    parse_cell(raw, column.column_type)
                })
                .collect()
        })
        .collect()
}

/// Builds the table from the first response plus any further partitions.
pub(crate) fn into_query_result(
    first: &StatementResponse,
    partitions: &[StatementResponse],
) -> QueryResult {
    let columns = first.columns();
    let mut rows = parse_rows(&columns, &first.data);
    for partition in partitions {
        rows.extend(parse_rows(&columns, &partition.data));
    }
    QueryResult::new(columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const BODY: &str = r#"{
        "resultSetMetaData": {
            "numRows": 2,
            "rowType": [
                {"name": "WAREHOUSE_NAME", "type": "text", "scale": null},
                {"name": "CREDITS_USED", "type": "fixed", "scale": 9},
                {"name": "QUERIES", "type": "fixed", "scale": 0},
                {"name": "START_TIME", "type": "timestamp_ltz", "scale": 9}
            ],
            "partitionInfo": [{"rowCount": 2}]
        },
        "data": [
            ["WH1", "10.500000000", "42", "1700000000.250000000"],
            ["WH2", null, "7", "1700000060.000000000 1440"]
        ],
        "code": "090001",
        "statementHandle": "01b2-handle",
        "message": "Statement executed successfully."
    }"#;

    #[test]
    fn parses_typed_rows() {
        let response: StatementResponse = serde_json::from_str(BODY).unwrap();
        let table = into_query_result(&response, &[]);

        assert_eq!(
            table.column_names(),
            vec!["WAREHOUSE_NAME", "CREDITS_USED", "QUERIES", "START_TIME"]
        );
        assert_eq!(table.columns()[1].column_type, ColumnType::Float);
        assert_eq!(table.columns()[2].column_type, ColumnType::Integer);
        assert_eq!(table.cell(0, "CREDITS_USED"), Some(&CellValue::Float(10.5)));
        assert_eq!(table.cell(1, "CREDITS_USED"), Some(&CellValue::Null));
        assert_eq!(table.cell(0, "QUERIES"), Some(&CellValue::Integer(42)));
        assert_eq!(
            table.cell(0, "START_TIME"),
            Some(&CellValue::Timestamp(
                chrono::Utc.timestamp_opt(1_700_000_000, 250_000_000).unwrap()
            ))
        );
        assert_eq!(
            table.cell(1, "START_TIME"),
            Some(&CellValue::Timestamp(
                chrono::Utc.timestamp_opt(1_700_000_060, 0).unwrap()
            ))
        );
    }

    #[test]
    fn appends_partitions_in_order() {
        let first: StatementResponse = serde_json::from_str(BODY).unwrap();
        let second = StatementResponse {
            data: vec![vec![
                Some("WH3".to_string()),
                Some("1".to_string()),
                Some("1".to_string()),
                None,
            ]],
            ..Default::default()
        };
        let table = into_query_result(&first, &[second]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.cell(2, "WAREHOUSE_NAME"), Some(&CellValue::from("WH3")));
        assert_eq!(table.cell(2, "START_TIME"), Some(&CellValue::Null));
    }

    #[test]
    fn negative_epochs_keep_fraction_sign() {
        let expected = chrono::Utc.timestamp_opt(-2, 500_000_000).unwrap();
        assert_eq!(parse_epoch("-1.5"), Some(expected));

        let expected = chrono::Utc.timestamp_opt(-1, 750_000_000).unwrap();
        assert_eq!(parse_epoch("-0.25 1440"), Some(expected));

        assert_eq!(parse_epoch("-3"), chrono::Utc.timestamp_opt(-3, 0).single());
    }

    #[test]
    fn unparseable_numbers_stay_text() {
        assert_eq!(parse_cell(Some("n/a"), ColumnType::Integer), CellValue::from("n/a"));
        assert_eq!(parse_cell(Some("1.5"), ColumnType::Integer), CellValue::Float(1.5));
        assert_eq!(parse_cell(None, ColumnType::Text), CellValue::Null);
    }

    #[test]
    fn partition_count_defaults_to_one() {
        let response = StatementResponse::default();
        assert_eq!(response.partition_count(), 1);
    }

    #[test]
    fn real_and_scaled_fixed_are_float() {
        let real = RowType {
            name: "X".to_string(),
            type_name: "REAL".to_string(),
            scale: None,
        };
        assert_eq!(column_type(&real), ColumnType::Float);
        let boolean = RowType {
            name: "B".to_string(),
            type_name: "boolean".to_string(),
            scale: None,
        };
        assert_eq!(column_type(&boolean), ColumnType::Text);
    }
}
