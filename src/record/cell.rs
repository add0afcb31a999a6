//! Resolved scalar values stored in flat rows.

use serde::{Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A resolved table cell.
///
/// Missing or unset values are the empty string, never a separate variant,
/// so "missing" compares equal to an explicit blank when grouping.
#[derive(Debug, Clone)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn empty() -> Self {
        Cell::Text(String::new())
    }

    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Text(s) if s.is_empty())
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Cell::Number(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            Cell::Number(_) => None,
        }
    }

    /// Numeric value used by measures: blanks count as zero, and text that
    /// parses as a number is accepted.
    pub fn measure_value(&self) -> f64 {
        match self {
            Cell::Number(n) => *n,
            Cell::Text(s) => s.trim().parse().unwrap_or(0.0),
        }
    }

    fn number_bits(n: f64) -> u64 {
        // -0.0 and 0.0 must land in the same group
        if n == 0.0 {
            0.0f64.to_bits()
        } else {
            n.to_bits()
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::empty()
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Text(a), Cell::Text(b)) => a == b,
            (Cell::Number(a), Cell::Number(b)) => Self::number_bits(*a) == Self::number_bits(*b),
            _ => false,
        }
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Cell::Text(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            Cell::Number(n) => {
                1u8.hash(state);
                Self::number_bits(*n).hash(state);
            }
        }
    }
}

/// Largest magnitude below which every integer is exact in an `f64` (2^53).
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

fn is_exact_int(n: f64) -> bool {
    n.fract() == 0.0 && n.abs() < MAX_EXACT_INT
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) if is_exact_int(*n) => write!(f, "{}", *n as i64),
            // integral but past 2^53: full digits, no trailing ".0"
            Cell::Number(n) if n.fract() == 0.0 => write!(f, "{:.0}", n),
            Cell::Number(n) => {
                let mut buf = ryu::Buffer::new();
                f.write_str(buf.format(*n))
            }
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Number(n) if is_exact_int(*n) => serializer.serialize_i64(*n as i64),
            Cell::Number(n) => serializer.serialize_f64(*n),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(n as f64)
    }
}
