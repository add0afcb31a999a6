//! Grouping aggregation over flat rows.
//!
//! Every column not named as a measure is a dimension. Rows with identical
//! dimension values collapse into one row whose measures are summed or
//! averaged:
//!
//! ```text
//! Order  Item     Qty  Price          Order  Item     Qty  Price
//! SO001  Zipper   2    10        ──►  SO001  Zipper   5    10
//! SO001  Zipper   3    10             SO002  Slider   1    4.5
//! SO002  Slider   1    4.5
//! ```
//!
//! Partitions come out in order of first appearance and keep the input
//! column order.

mod measure;

pub use measure::{infer_measures, Measure, ParseMeasureError};

use crate::record::Cell;
use crate::table::{FlatRow, Table};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Decimal places kept on aggregated measures.
pub const MEASURE_DECIMALS: i32 = 2;

/// Rows with unique dimension values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedTable {
    rows: Vec<FlatRow>,
}

impl AggregatedTable {
    pub fn rows(&self) -> &[FlatRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<FlatRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_table(&self) -> Table {
        Table::from_rows(&self.rows)
    }
}

struct Group {
    cells: Vec<Cell>,
    totals: Vec<f64>,
    count: usize,
}

/// Group rows by every non-measure column and combine the measures.
///
/// With no measures this degrades to removing exact duplicate rows.
pub fn aggregate(rows: &[FlatRow], measures: &HashMap<String, Measure>) -> AggregatedTable {
    let Some(first) = rows.first() else {
        return AggregatedTable::default();
    };
    if measures.is_empty() {
        return deduplicate(rows);
    }

    let columns: Vec<&str> = first.columns().collect();
    for name in measures.keys() {
        if !columns.contains(&name.as_str()) {
            debug!(measure = %name, "measure column not present in rows, ignoring");
        }
    }

    let mut dimensions = Vec::new();
    let mut measure_slots = Vec::new();
    for (i, column) in columns.iter().enumerate() {
        match measures.get(*column) {
            Some(measure) => measure_slots.push((i, *measure)),
            None => dimensions.push(i),
        }
    }

    let mut index: HashMap<Vec<Cell>, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for row in rows {
        let cells: Vec<Cell> = columns
            .iter()
            .map(|column| row.get(column).cloned().unwrap_or_default())
            .collect();
        let key: Vec<Cell> = dimensions.iter().map(|&i| cells[i].clone()).collect();

        let slot = match index.entry(key) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                groups.push(Group {
                    cells,
                    totals: vec![0.0; measure_slots.len()],
                    count: 0,
                });
                *entry.insert(groups.len() - 1)
            }
        };

        let group = &mut groups[slot];
        group.count += 1;
        for (total, (i, _)) in group.totals.iter_mut().zip(&measure_slots) {
            // blanks count as zero
            *total += row.get(columns[*i]).map(Cell::measure_value).unwrap_or(0.0);
        }
    }

    debug!(input = rows.len(), output = groups.len(), "aggregated rows");

    let rows = groups
        .into_iter()
        .map(|group| {
            let mut cells = group.cells;
            for (total, (i, measure)) in group.totals.iter().zip(&measure_slots) {
                let value = match measure {
                    Measure::Sum => *total,
                    // Unset values were counted as 0 and stay in the
                    // denominator, so sparse columns average low. The
                    // reporting sheets have always been computed this way.
                    Measure::Mean => *total / group.count as f64,
                };
                cells[*i] = Cell::Number(round_to(value, MEASURE_DECIMALS));
            }
            let mut row = FlatRow::with_capacity(columns.len());
            for (column, cell) in columns.iter().zip(cells) {
                row.push(column.to_string(), cell);
            }
            row
        })
        .collect();

    AggregatedTable { rows }
}

fn deduplicate(rows: &[FlatRow]) -> AggregatedTable {
    let mut seen: HashSet<&FlatRow> = HashSet::new();
    let rows: Vec<FlatRow> = rows
        .iter()
        .filter(|row| seen.insert(*row))
        .cloned()
        .collect();
    AggregatedTable { rows }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
