//! Scoped field lookup across a fan-out chain.

use crate::record::{RawRecord, RawValue};

/// Which level of the fan-out chain a lookup reads.
///
/// Level 0 is the root record, level 1 the first fan-out element, and so on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Innermost level that has the field.
    #[default]
    Nearest,
    /// Exactly this level. Blank when the row has no element there.
    Level(usize),
}

/// A record seen through its fan-out ancestry.
///
/// Scopes run from the root record down to the current sub-record. An
/// unbound lookup takes the innermost scope that has the field; a lookup
/// bound to a level reads only that level.
#[derive(Debug, Clone)]
pub struct RecordView<'a> {
    scopes: Vec<&'a RawRecord>,
}

impl<'a> RecordView<'a> {
    pub fn root(record: &'a RawRecord) -> Self {
        Self {
            scopes: vec![record],
        }
    }

    pub(crate) fn child(&self, record: &'a RawRecord) -> Self {
        let mut scopes = self.scopes.clone();
        scopes.push(record);
        Self { scopes }
    }

    pub fn get(&self, field: &str) -> Option<&'a RawValue> {
        self.scopes.iter().rev().find_map(|scope| scope.get(field))
    }

    /// Look a field up at `scope`.
    ///
    /// A row cut short by an empty fan-out has fewer levels than the
    /// mapping's path, so a level past the end finds nothing.
    pub fn lookup(&self, field: &str, scope: Scope) -> Option<&'a RawValue> {
        match scope {
            Scope::Nearest => self.get(field),
            Scope::Level(level) => self.scopes.get(level).and_then(|record| record.get(field)),
        }
    }

    /// Numeric value of a field, if present and numeric.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(RawValue::as_number)
    }

    /// The innermost record.
    pub fn record(&self) -> &'a RawRecord {
        // a view always has its root scope
        self.scopes[self.scopes.len() - 1]
    }

    pub fn root_record(&self) -> &'a RawRecord {
        self.scopes[0]
    }

    /// Number of fan-out levels below the root.
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }
}
