//! Column extraction rules and the ordered column mapping.

use super::view::{RecordView, Scope};
use crate::record::{Cell, RawValue};
use crate::resolve::{resolve, resolve_cell};
use std::collections::BTreeSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;

/// Failure while computing one column of one row.
///
/// Never escapes the flattener: the cell falls back to empty.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    #[error("missing field: {0}")]
    MissingField(String),

    #[error("unexpected value for {field}: {found}")]
    UnexpectedShape { field: String, found: String },

    #[error("rule panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

/// Signature of a computed column.
pub type ComputeFn = dyn Fn(&RecordView<'_>) -> Result<Cell, RuleError> + Send + Sync;

/// How one output column is pulled out of a record.
///
/// `Field`, `Nested` and `Joined` read their field at a [`Scope`]. Unbound
/// rules take the innermost level that has the field; bind a rule with
/// [`ExtractionRule::at`] when parent and child records share field names.
#[derive(Clone)]
pub enum ExtractionRule {
    /// Shallow lookup of a field.
    Field { field: String, scope: Scope },
    /// One level of reference traversal, e.g. `("partner_id", "group")`.
    Nested {
        field: String,
        subfield: String,
        scope: Scope,
    },
    /// Distinct values of a one-to-many field, sorted and joined with `", "`.
    Joined {
        field: String,
        subfield: Option<String>,
        scope: Scope,
    },
    /// Escape hatch for derived columns.
    Computed(Arc<ComputeFn>),
}

impl ExtractionRule {
    pub fn field(name: impl Into<String>) -> Self {
        ExtractionRule::Field {
            field: name.into(),
            scope: Scope::Nearest,
        }
    }

    pub fn nested(field: impl Into<String>, subfield: impl Into<String>) -> Self {
        ExtractionRule::Nested {
            field: field.into(),
            subfield: subfield.into(),
            scope: Scope::Nearest,
        }
    }

    pub fn joined(field: impl Into<String>, subfield: Option<&str>) -> Self {
        ExtractionRule::Joined {
            field: field.into(),
            subfield: subfield.map(str::to_string),
            scope: Scope::Nearest,
        }
    }

    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&RecordView<'_>) -> Result<Cell, RuleError> + Send + Sync + 'static,
    {
        ExtractionRule::Computed(Arc::new(f))
    }

    /// Bind the lookup to one fan-out level (0 is the root record).
    pub fn at(self, level: usize) -> Self {
        self.in_scope(Scope::Level(level))
    }

    /// Set the lookup scope. Computed rules do their own lookups and are
    /// returned unchanged.
    pub fn in_scope(mut self, new_scope: Scope) -> Self {
        match &mut self {
            ExtractionRule::Field { scope, .. }
            | ExtractionRule::Nested { scope, .. }
            | ExtractionRule::Joined { scope, .. } => *scope = new_scope,
            ExtractionRule::Computed(_) => {}
        }
        self
    }

    pub fn scope(&self) -> Option<Scope> {
        match self {
            ExtractionRule::Field { scope, .. }
            | ExtractionRule::Nested { scope, .. }
            | ExtractionRule::Joined { scope, .. } => Some(*scope),
            ExtractionRule::Computed(_) => None,
        }
    }

    /// Evaluate the rule against a view.
    pub fn apply(&self, view: &RecordView<'_>) -> Result<Cell, RuleError> {
        match self {
            ExtractionRule::Field { field, scope } => Ok(view
                .lookup(field, *scope)
                .map(|value| resolve_cell(value, None))
                .unwrap_or_default()),
            ExtractionRule::Nested {
                field,
                subfield,
                scope,
            } => Ok(view
                .lookup(field, *scope)
                .map(|value| resolve_cell(value, Some(subfield)))
                .unwrap_or_default()),
            ExtractionRule::Joined {
                field,
                subfield,
                scope,
            } => Ok(Cell::Text(joined(
                view.lookup(field, *scope),
                subfield.as_deref(),
            ))),
            ExtractionRule::Computed(f) => {
                match panic::catch_unwind(AssertUnwindSafe(|| f(view))) {
                    Ok(result) => result,
                    Err(payload) => Err(RuleError::Panicked(panic_message(payload.as_ref()))),
                }
            }
        }
    }
}

impl fmt::Debug for ExtractionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionRule::Field { field, scope } => f
                .debug_struct("Field")
                .field("field", field)
                .field("scope", scope)
                .finish(),
            ExtractionRule::Nested {
                field,
                subfield,
                scope,
            } => f
                .debug_struct("Nested")
                .field("field", field)
                .field("subfield", subfield)
                .field("scope", scope)
                .finish(),
            ExtractionRule::Joined {
                field,
                subfield,
                scope,
            } => f
                .debug_struct("Joined")
                .field("field", field)
                .field("subfield", subfield)
                .field("scope", scope)
                .finish(),
            ExtractionRule::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

fn joined(value: Option<&RawValue>, subfield: Option<&str>) -> String {
    let distinct: BTreeSet<String> = match value {
        Some(RawValue::List(items)) => items
            .iter()
            .map(|item| resolve(item, subfield))
            .filter(|s| !s.is_empty())
            .collect(),
        Some(other) => std::iter::once(resolve(other, subfield))
            .filter(|s| !s.is_empty())
            .collect(),
        None => BTreeSet::new(),
    };
    distinct.into_iter().collect::<Vec<_>>().join(", ")
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Ordered output columns plus the fan-out path they expand along.
#[derive(Debug, Clone, Default)]
pub struct ColumnMapping {
    columns: Vec<(String, ExtractionRule)>,
    fan_out: Vec<String>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column. Re-declaring a column replaces its rule in place.
    pub fn column(mut self, name: impl Into<String>, rule: ExtractionRule) -> Self {
        let name = name.into();
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = rule,
            None => self.columns.push((name, rule)),
        }
        self
    }

    pub fn field(self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.column(name, ExtractionRule::field(field))
    }

    /// A field read at exactly one fan-out level.
    pub fn field_at(self, name: impl Into<String>, field: impl Into<String>, level: usize) -> Self {
        self.column(name, ExtractionRule::field(field).at(level))
    }

    pub fn nested(
        self,
        name: impl Into<String>,
        field: impl Into<String>,
        subfield: impl Into<String>,
    ) -> Self {
        self.column(name, ExtractionRule::nested(field, subfield))
    }

    pub fn joined(self, name: impl Into<String>, field: impl Into<String>, subfield: Option<&str>) -> Self {
        self.column(name, ExtractionRule::joined(field, subfield))
    }

    pub fn computed<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&RecordView<'_>) -> Result<Cell, RuleError> + Send + Sync + 'static,
    {
        self.column(name, ExtractionRule::computed(f))
    }

    /// Expand along nested one-to-many fields, outermost first,
    /// e.g. `["order_line", "invoice_lines"]`.
    pub fn fan_out<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fan_out = path.into_iter().map(Into::into).collect();
        self
    }

    pub fn columns(&self) -> &[(String, ExtractionRule)] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn fan_out_path(&self) -> &[String] {
        &self.fan_out
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
