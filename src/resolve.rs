//! Field resolution: turning any upstream value shape into display text.
//!
//! The ERP API renders a relational field in several ways depending on the
//! requested fields and the server version:
//!
//! ```text
//! {"display_name": "Acme Ltd", "group": {...}}   expanded reference
//! [42, "Acme Ltd"]                               compact reference
//! 42                                             bare id
//! false                                          unset
//! ```
//!
//! [`resolve`] maps every one of them to a string and never fails: shapes
//! it does not model fall through to the generic string conversion.

use crate::record::{Cell, RawValue, Scalar};

/// Key holding the human-readable label of an expanded reference.
pub const DISPLAY_NAME: &str = "display_name";

/// Resolve a value (optionally one of its sub-fields) to display text.
///
/// `subfield` only applies to mappings; for any other shape it is ignored
/// and the value itself is resolved, so a bare id where an expanded
/// reference was expected still renders as its decimal form.
pub fn resolve(value: &RawValue, subfield: Option<&str>) -> String {
    match value {
        RawValue::Empty => String::new(),
        RawValue::Mapping(fields) => match subfield {
            Some(name) => resolve(fields.get(name).unwrap_or(&RawValue::Empty), None),
            None => match fields.get(DISPLAY_NAME) {
                Some(label) => label_text(label),
                // Loose fallback for shapes nobody modeled: keep every value.
                None => fields
                    .values()
                    .filter(|v| !v.is_empty())
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(" "),
            },
        },
        RawValue::Reference { label, .. } => label_text(label),
        RawValue::List(items) => match items.as_slice() {
            [] => String::new(),
            [only] => resolve(only, None),
            [_, label, ..] => label_text(label),
        },
        RawValue::Scalar(Scalar::Int(i)) => i.to_string(),
        RawValue::Scalar(other) => other.to_string(),
    }
}

/// Resolve a value into a cell, keeping numeric scalars numeric.
///
/// Quantities and amounts stay numbers so they can be aggregated; every
/// other shape goes through [`resolve`].
pub fn resolve_cell(value: &RawValue, subfield: Option<&str>) -> Cell {
    match (value, subfield) {
        (RawValue::Mapping(fields), Some(name)) => {
            resolve_cell(fields.get(name).unwrap_or(&RawValue::Empty), None)
        }
        (RawValue::Scalar(Scalar::Int(i)), None) => Cell::Number(*i as f64),
        (RawValue::Scalar(Scalar::Float(x)), None) => Cell::Number(*x),
        _ => Cell::Text(resolve(value, subfield)),
    }
}

fn label_text(label: &RawValue) -> String {
    if label.is_falsy() {
        String::new()
    } else {
        resolve(label, None)
    }
}
