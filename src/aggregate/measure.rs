//! Measure kinds and measure inference.

use crate::table::FlatRow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// How a measure column combines across a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Measure {
    Sum,
    #[serde(alias = "avg", alias = "average")]
    Mean,
}

impl Measure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Measure::Sum => "sum",
            Measure::Mean => "mean",
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown measure '{0}', expected 'sum' or 'mean'")]
pub struct ParseMeasureError(pub String);

impl FromStr for Measure {
    type Err = ParseMeasureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Measure::Sum),
            "mean" | "avg" | "average" => Ok(Measure::Mean),
            other => Err(ParseMeasureError(other.to_string())),
        }
    }
}

/// Pick the numeric columns of a row set as `sum` measures.
///
/// A column qualifies when it holds at least one number and nothing but
/// numbers or blanks. Everything else is left as a dimension.
pub fn infer_measures(rows: &[FlatRow]) -> HashMap<String, Measure> {
    let Some(first) = rows.first() else {
        return HashMap::new();
    };

    first
        .columns()
        .filter(|column| {
            let mut any_number = false;
            let all_numeric = rows.iter().all(|row| match row.get(column) {
                Some(cell) if cell.is_number() => {
                    any_number = true;
                    true
                }
                Some(cell) => cell.is_empty(),
                None => true,
            });
            all_numeric && any_number
        })
        .map(|column| (column.to_string(), Measure::Sum))
        .collect()
}
