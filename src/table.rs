//! Flat rows and the header-plus-rows table handed to sinks.

use crate::record::Cell;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// One output row: column names paired with resolved cells, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FlatRow {
    cells: Vec<(String, Cell)>,
}

impl FlatRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: Vec::with_capacity(capacity),
        }
    }

    /// Builder-style [`FlatRow::set`].
    pub fn with(mut self, column: impl Into<String>, cell: impl Into<Cell>) -> Self {
        self.set(column, cell.into());
        self
    }

    /// Set a column, replacing it in place or appending it at the end.
    pub fn set(&mut self, column: impl Into<String>, cell: Cell) {
        let column = column.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = cell,
            None => self.cells.push((column, cell)),
        }
    }

    pub(crate) fn push(&mut self, column: String, cell: Cell) {
        self.cells.push((column, cell));
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell)
    }

    pub fn get_mut(&mut self, column: &str) -> Option<&mut Cell> {
        self.cells
            .iter_mut()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().map(|(_, cell)| cell)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.cells.iter().map(|(name, cell)| (name.as_str(), cell))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for FlatRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, cell) in &self.cells {
            map.serialize_entry(name, cell)?;
        }
        map.end()
    }
}

/// A header row plus data rows, the shape every sink accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a table from flat rows.
    ///
    /// The header comes from the first row. Later rows are read by column
    /// name, so a row missing a column contributes an empty cell rather
    /// than shifting its neighbours.
    pub fn from_rows(rows: &[FlatRow]) -> Self {
        let header: Vec<String> = match rows.first() {
            Some(first) => first.columns().map(str::to_string).collect(),
            None => return Self::default(),
        };
        let rows = rows
            .iter()
            .map(|row| {
                header
                    .iter()
                    .map(|column| row.get(column).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        Self { header, rows }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of data rows (the header is not counted).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header row followed by data rows, every cell rendered as text.
    pub fn to_string_rows(&self) -> Vec<Vec<String>> {
        std::iter::once(self.header.clone())
            .chain(
                self.rows
                    .iter()
                    .map(|row| row.iter().map(Cell::to_string).collect()),
            )
            .collect()
    }
}

/// Serializes as an array of objects keyed by header.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct RowRef<'a> {
            header: &'a [String],
            cells: &'a [Cell],
        }

        impl Serialize for RowRef<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.header.len()))?;
                for (name, cell) in self.header.iter().zip(self.cells) {
                    map.serialize_entry(name, cell)?;
                }
                map.end()
            }
        }

        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for cells in &self.rows {
            seq.serialize_element(&RowRef {
                header: &self.header,
                cells,
            })?;
        }
        seq.end()
    }
}
