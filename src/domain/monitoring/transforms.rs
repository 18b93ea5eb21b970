//! Post-processing applied to raw results before display.
//!
//! Each [`Transform`] is a pure function from one [`QueryResult`] to the next.
//! Derived columns never fail: missing, null or non-numeric inputs and zero
//! denominators produce a null cell.

use regex::Regex;

use super::table::{CellValue, Column, ColumnType, QueryResult};

/// Bytes in one megabyte (binary).
pub const BYTES_PER_MEGABYTE: f64 = 1_048_576.0;

/// A single post-processing step.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// Divides `source` by 1,048,576 into `target` (replacing `source` when
    /// both names match).
    BytesToMegabytes {
        source: &'static str,
        target: &'static str,
    },
    /// `numerator / denominator * 100` into `target`.
    RatioPercent {
        numerator: &'static str,
        denominator: &'static str,
        target: &'static str,
    },
    /// Keeps the listed `(source, display)` columns in the given order.
    Project(&'static [(&'static str, &'static str)]),
    /// Stable sort, descending by `column`.
    SortDescending { column: &'static str },
    /// Counts whole-word occurrences of `token` in `source` into `target`.
    TokenCount {
        source: &'static str,
        token: &'static str,
        target: &'static str,
    },
}

impl Transform {
    pub fn apply(&self, result: QueryResult) -> QueryResult {
        match self {
            Transform::BytesToMegabytes { source, target } => {
                derive_column(result, target, ColumnType::Float, |table, row| {
                    table
                        .column_index(source)
                        .and_then(|idx| row[idx].as_f64())
                        .map(bytes_to_megabytes)
                        .into()
                })
            }
            Transform::RatioPercent {
                numerator,
                denominator,
                target,
            } => derive_column(result, target, ColumnType::Float, |table, row| {
                let num = table.column_index(numerator).and_then(|i| row[i].as_f64());
                let den = table.column_index(denominator).and_then(|i| row[i].as_f64());
                match (num, den) {
                    (Some(n), Some(d)) => ratio_percent(n, d).into(),
                    _ => CellValue::Null,
                }
            }),
            Transform::Project(mapping) => project(result, mapping),
            Transform::SortDescending { column } => sort_descending(result, column),
            Transform::TokenCount {
                source,
                token,
                target,
            } => derive_column(result, target, ColumnType::Integer, |table, row| {
                table
                    .column_index(source)
                    .and_then(|idx| row[idx].as_str())
                    .map(|text| count_token(text, token) as i64)
                    .into()
            }),
        }
    }
}

/// Runs `steps` in order.
pub fn apply_all(result: QueryResult, steps: &[Transform]) -> QueryResult {
    steps.iter().fold(result, |acc, step| step.apply(acc))
}

pub fn bytes_to_megabytes(bytes: f64) -> f64 {
    bytes / BYTES_PER_MEGABYTE
}

/// Percentage ratio, `None` when the denominator is zero.
pub fn ratio_percent(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator * 100.0)
    }
}

/// Counts non-overlapping, case-insensitive, whole-word occurrences of
/// `token` in `text`.
pub fn count_token(text: &str, token: &str) -> usize {
    if token.is_empty() {
        return 0;
    }
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(token)))
        .map(|pattern| pattern.find_iter(text).count())
        .unwrap_or(0)
}

/// Stable descending sort. Unknown columns leave the order untouched.
pub fn sort_descending(result: QueryResult, column: &str) -> QueryResult {
    let Some(idx) = result.column_index(column) else {
        return result;
    };
    let (columns, mut rows) = result.into_parts();
    rows.sort_by(|a, b| b[idx].severity_cmp(&a[idx]));
    QueryResult::new(columns, rows)
}

fn project(result: QueryResult, mapping: &[(&str, &str)]) -> QueryResult {
    let picks: Vec<(usize, &str)> = mapping
        .iter()
        .filter_map(|(source, display)| result.column_index(source).map(|idx| (idx, *display)))
        .collect();
    let columns = picks
        .iter()
        .map(|(idx, display)| Column::new(*display, result.columns()[*idx].column_type))
        .collect();
    let rows = result
        .rows()
        .iter()
        .map(|row| picks.iter().map(|(idx, _)| row[*idx].clone()).collect())
        .collect();
    QueryResult::new(columns, rows)
}

fn derive_column<F>(result: QueryResult, target: &str, column_type: ColumnType, derive: F) -> QueryResult
where
    F: Fn(&QueryResult, &[CellValue]) -> CellValue,
{
    let derived: Vec<CellValue> = result.rows().iter().map(|row| derive(&result, row)).collect();
    let existing = result.column_index(target);
    let (mut columns, mut rows) = result.into_parts();
    match existing {
        Some(idx) => {
            columns[idx] = Column::new(columns[idx].name.clone(), column_type);
            for (row, value) in rows.iter_mut().zip(derived) {
                row[idx] = value;
            }
        }
        None => {
            columns.push(Column::new(target, column_type));
            for (row, value) in rows.iter_mut().zip(derived) {
                row.push(value);
            }
        }
    }
    QueryResult::new(columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn credits(rows: &[(&str, i64)]) -> QueryResult {
        QueryResult::new(
            vec![
                Column::new("WAREHOUSE_NAME", ColumnType::Text),
                Column::new("CREDITS_USED", ColumnType::Integer),
            ],
            rows.iter()
                .map(|(name, credits)| vec![(*name).into(), (*credits).into()])
                .collect(),
        )
    }

    fn names(result: &QueryResult) -> Vec<String> {
        result
            .column_values("WAREHOUSE_NAME")
            .unwrap()
            .iter()
            .map(|v| v.display())
            .collect()
    }

    #[test]
    fn megabyte_conversion_examples() {
        assert_eq!(bytes_to_megabytes(1_048_576.0), 1.0);
        assert_eq!(bytes_to_megabytes(0.0), 0.0);
    }

    #[test]
    fn ratio_percent_examples() {
        assert_eq!(ratio_percent(50.0, 0.0), None);
        assert_eq!(ratio_percent(25.0, 100.0), Some(25.0));
    }

    #[test]
    fn token_count_is_whole_word_and_case_insensitive() {
        let sql = "select a from t join b on t.id = b.id JOINED";
        assert_eq!(count_token(sql, "JOIN"), 1);
        assert_eq!(count_token("JOIN x Join y join", "join"), 3);
        assert_eq!(count_token("LEFT_JOIN rejoin", "JOIN"), 0);
        assert_eq!(count_token("anything", ""), 0);
    }

    #[test]
    fn bytes_to_megabytes_adds_target_column() {
        let raw = QueryResult::new(
            vec![Column::new("BYTES_SPILLED", ColumnType::Integer)],
            vec![vec![2_097_152i64.into()], vec![CellValue::Null]],
        );
        let out = Transform::BytesToMegabytes {
            source: "bytes_spilled",
            target: "MB_SPILLED",
        }
        .apply(raw);
        assert_eq!(out.cell(0, "MB_SPILLED"), Some(&CellValue::Float(2.0)));
        assert_eq!(out.cell(1, "MB_SPILLED"), Some(&CellValue::Null));
    }

    #[test]
    fn bytes_to_megabytes_in_place_replaces_values() {
        let raw = QueryResult::new(
            vec![Column::new("BYTES_SCANNED", ColumnType::Integer)],
            vec![vec![1_048_576i64.into()]],
        );
        let out = Transform::BytesToMegabytes {
            source: "BYTES_SCANNED",
            target: "BYTES_SCANNED",
        }
        .apply(raw);
        assert_eq!(out.columns().len(), 1);
        assert_eq!(out.columns()[0].column_type, ColumnType::Float);
        assert_eq!(out.cell(0, "BYTES_SCANNED"), Some(&CellValue::Float(1.0)));
    }

    #[test]
    fn ratio_percent_guards_zero_denominator() {
        let raw = QueryResult::new(
            vec![
                Column::new("HIT", ColumnType::Integer),
                Column::new("TOTAL", ColumnType::Integer),
            ],
            vec![vec![50i64.into(), 0i64.into()], vec![25i64.into(), 100i64.into()]],
        );
        let out = Transform::RatioPercent {
            numerator: "HIT",
            denominator: "TOTAL",
            target: "HIT_PERCENT",
        }
        .apply(raw);
        assert_eq!(out.cell(0, "HIT_PERCENT"), Some(&CellValue::Null));
        assert_eq!(out.cell(1, "HIT_PERCENT"), Some(&CellValue::Float(25.0)));
    }

    #[test]
    fn project_renames_and_reorders_ignoring_case() {
        let raw = QueryResult::from_named_rows(
            vec!["name".into(), "state".into(), "size".into()],
            vec![vec!["WH1".into(), "STARTED".into(), "X-Small".into()]],
        );
        let out = Transform::Project(&[("SIZE", "WAREHOUSE_SIZE"), ("Name", "WAREHOUSE_NAME")]).apply(raw);
        assert_eq!(out.column_names(), vec!["WAREHOUSE_SIZE", "WAREHOUSE_NAME"]);
        assert_eq!(out.rows()[0], vec![CellValue::from("X-Small"), CellValue::from("WH1")]);
    }

    #[test]
    fn project_skips_missing_columns() {
        let raw = QueryResult::from_named_rows(vec!["name".into()], vec![vec!["WH1".into()]]);
        let out = Transform::Project(&[("name", "WAREHOUSE_NAME"), ("ghost", "GHOST")]).apply(raw);
        assert_eq!(out.column_names(), vec!["WAREHOUSE_NAME"]);
    }

    #[test]
    fn sort_descending_is_stable_for_ties() {
        let out = sort_descending(credits(&[("A", 1), ("B", 5), ("C", 1), ("D", 5)]), "CREDITS_USED");
        assert_eq!(names(&out), vec!["B", "D", "A", "C"]);
    }

    #[test]
    fn sort_descending_on_unknown_column_keeps_order() {
        let out = sort_descending(credits(&[("A", 1), ("B", 5)]), "NOPE");
        assert_eq!(names(&out), vec!["A", "B"]);
    }

    #[test]
    fn apply_all_runs_steps_in_order() {
        const STEPS: &[Transform] = &[
            Transform::SortDescending { column: "CREDITS_USED" },
            Transform::Project(&[("WAREHOUSE_NAME", "WAREHOUSE")]),
        ];
        let out = apply_all(credits(&[("WH2", 5), ("WH1", 10)]), STEPS);
        assert_eq!(out.column_names(), vec!["WAREHOUSE"]);
        assert_eq!(out.rows()[0][0], CellValue::from("WH1"));
    }

    proptest! {
        #[test]
        fn megabytes_match_division(bytes in 0u64..(1u64 << 50)) {
            prop_assert_eq!(bytes_to_megabytes(bytes as f64), bytes as f64 / 1_048_576.0);
        }

        #[test]
        fn ratio_is_null_only_for_zero_denominator(n in -1.0e9f64..1.0e9, d in -1.0e9f64..1.0e9) {
            match ratio_percent(n, d) {
                None => prop_assert_eq!(d, 0.0),
                Some(p) => prop_assert_eq!(p, n / d * 100.0),
            }
        }

        #[test]
        fn sorting_is_idempotent(values in proptest::collection::vec(0i64..20, 0..40)) {
            let rows: Vec<(String, i64)> = values
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("WH{}", i), *v))
                .collect();
            let borrowed: Vec<(&str, i64)> = rows.iter().map(|(n, v)| (n.as_str(), *v)).collect();
            let once = sort_descending(credits(&borrowed), "CREDITS_USED");
            let twice = sort_descending(once.clone(), "CREDITS_USED");
            prop_assert_eq!(&once, &twice);

            let sorted: Vec<f64> = once
                .column_values("CREDITS_USED")
                .unwrap()
                .iter()
                .filter_map(|v| v.as_f64())
                .collect();
            prop_assert!(sorted.windows(2).all(|w| w[0] >= w[1]));
        }
    }
}
