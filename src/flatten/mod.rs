//! Record flattening.
//!
//! Turns one nested record into one or more flat rows according to a
//! [`ColumnMapping`]. When the mapping declares a fan-out path, every
//! element of the deepest populated list becomes its own row:
//!
//! ```text
//! sale.order SO001
//!   order_line[0]            ──► row: SO001 | line 0 | inv A
//!     invoice_lines[A]
//!   order_line[1]            ──► row: SO001 | line 1 | inv B
//!     invoice_lines[B]       ──► row: SO001 | line 1 | inv C
//!     invoice_lines[C]
//!   order_line[2]            ──► row: SO001 | line 2 | (blank)
//!     invoice_lines = []
//! ```
//!
//! A parent is never dropped: an empty, absent, or `false` list yields one
//! row whose sub-record columns are blank. Column failures are recovered
//! per cell, so a malformed field never costs the whole row.

mod rule;
mod view;

pub use rule::{ColumnMapping, ComputeFn, ExtractionRule, RuleError};
pub use view::{RecordView, Scope};

use crate::record::{Cell, RawRecord, RawValue};
use crate::table::FlatRow;
use tracing::debug;

/// Flatten one record into rows with the mapping's columns, in order.
pub fn flatten(record: &RawRecord, mapping: &ColumnMapping) -> Vec<FlatRow> {
    let mut rows = Vec::new();
    expand(
        RecordView::root(record),
        mapping.fan_out_path(),
        mapping,
        &mut rows,
    );
    rows
}

/// Flatten a whole result set, keeping record order.
pub fn flatten_all<'a, I>(records: I, mapping: &ColumnMapping) -> Vec<FlatRow>
where
    I: IntoIterator<Item = &'a RawRecord>,
{
    records
        .into_iter()
        .flat_map(|record| flatten(record, mapping))
        .collect()
}

fn expand<'a>(
    view: RecordView<'a>,
    path: &[String],
    mapping: &ColumnMapping,
    out: &mut Vec<FlatRow>,
) {
    let Some((field, rest)) = path.split_first() else {
        out.push(evaluate(&view, mapping));
        return;
    };

    let children = sub_records(view.record().get(field));
    if children.is_empty() {
        debug!(field = %field, depth = view.depth(), "empty fan-out, keeping parent row");
        out.push(evaluate(&view, mapping));
        return;
    }

    for child in children {
        expand(view.child(child), rest, mapping, out);
    }
}

/// Sub-records of a one-to-many field.
///
/// A lone mapping counts as a single element; ids and other non-record
/// elements carry no fields to expand and are skipped.
fn sub_records(value: Option<&RawValue>) -> Vec<&RawRecord> {
    match value {
        Some(RawValue::List(items)) => items.iter().filter_map(RawValue::as_mapping).collect(),
        Some(RawValue::Mapping(record)) => vec![record],
        _ => Vec::new(),
    }
}

fn evaluate(view: &RecordView<'_>, mapping: &ColumnMapping) -> FlatRow {
    let mut row = FlatRow::with_capacity(mapping.len());
    for (name, rule) in mapping.columns() {
        let cell = match rule.apply(view) {
            Ok(cell) => cell,
            Err(err) => {
                debug!(column = %name, error = %err, "column extraction failed, leaving blank");
                Cell::empty()
            }
        };
        row.push(name.clone(), cell);
    }
    row
}
