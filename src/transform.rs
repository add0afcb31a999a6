//! Row transforms applied between flattening and aggregation.

use crate::record::Cell;
use crate::table::FlatRow;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// A per-row rewrite.
///
/// In TOML each transform is a single-key table:
///
/// ```toml
/// [[jobs.dispatch.transforms]]
/// date_only = "Order Date"
///
/// [[jobs.dispatch.transforms]]
/// product = { column = "Value", factors = ["Final Price", "Qty"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Drop the time part of a timestamp column. Unparseable text becomes blank.
    DateOnly(String),
    /// Set `column` to the product of the factor columns.
    Product { column: String, factors: Vec<String> },
}

impl Transform {
    pub fn apply(&self, row: &mut FlatRow) {
        match self {
            Transform::DateOnly(column) => {
                if let Some(Cell::Text(text)) = row.get_mut(column) {
                    *text = date_only(text);
                }
            }
            Transform::Product { column, factors } => {
                let value = factors
                    .iter()
                    .map(|factor| row.get(factor).map(Cell::measure_value).unwrap_or(0.0))
                    .product::<f64>();
                row.set(column.clone(), Cell::Number(value));
            }
        }
    }

    /// Column this transform writes.
    pub fn target(&self) -> &str {
        match self {
            Transform::DateOnly(column) => column,
            Transform::Product { column, .. } => column,
        }
    }

    /// Columns this transform reads.
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            Transform::DateOnly(column) => vec![column.as_str()],
            Transform::Product { factors, .. } => factors.iter().map(String::as_str).collect(),
        }
    }
}

/// Apply transforms in order to every row.
pub fn apply_all(transforms: &[Transform], rows: &mut [FlatRow]) {
    for row in rows.iter_mut() {
        for transform in transforms {
            transform.apply(row);
        }
    }
}

/// Reduce a date or timestamp string to `YYYY-MM-DD`.
pub fn date_only(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return datetime.date().format("%Y-%m-%d").to_string();
        }
    }
    match DateTime::parse_from_rfc3339(text) {
        Ok(datetime) => datetime.date_naive().format("%Y-%m-%d").to_string(),
        Err(_) => String::new(),
    }
}
