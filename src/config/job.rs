//! Job definitions: which columns to pull, how to fan out, what to aggregate.

use crate::aggregate::Measure;
use crate::flatten::{ColumnMapping, ExtractionRule};
use crate::sink::OutputFormat;
use crate::transform::Transform;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use thiserror::Error;

/// Problems found in a single job definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("no columns defined")]
    NoColumns,

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("column '{0}' has an empty field")]
    EmptyField(String),

    #[error("column '{column}' has unknown scope '{scope}'")]
    UnknownScope { column: String, scope: String },

    #[error("{what} refers to unknown column '{column}'")]
    UnknownColumn { what: &'static str, column: String },
}

/// One output column.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ColumnSettings {
    /// Header text.
    pub name: String,

    /// Source field, looked up innermost scope first.
    pub field: String,

    /// Field to read when the value is a nested record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subfield: Option<String>,

    /// Fan-out level to read the field from: `"root"`, a fan-out field
    /// name, or a dotted fan-out prefix such as `"order_line.invoice_lines"`.
    /// Unscoped columns take the innermost level that has the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Collapse a list of related records into sorted, distinct, comma
    /// separated text.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub join: bool,
}

/// A named export job.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct JobSettings {
    /// Saved query response to read instead of a live source.
    pub input: Option<PathBuf>,

    /// Output file. Standard output when absent.
    pub output: Option<PathBuf>,

    pub format: OutputFormat,

    /// Chain of list fields to expand, outermost first.
    pub fan_out: Vec<String>,

    pub columns: Vec<ColumnSettings>,

    /// Explicit measure columns.
    pub measures: BTreeMap<String, Measure>,

    /// Sum every all-numeric column not listed in `measures`.
    pub infer_measures: bool,

    pub transforms: Vec<Transform>,
}

impl JobSettings {
    /// Build the column mapping this job flattens with.
    ///
    /// Unknown scopes are rejected by [`JobSettings::validate`]; here they
    /// leave the column unbound.
    pub fn mapping(&self) -> ColumnMapping {
        let mapping = self
            .columns
            .iter()
            .fold(ColumnMapping::new(), |mapping, column| {
                let rule = match (&column.subfield, column.join) {
                    (subfield, true) => ExtractionRule::joined(&column.field, subfield.as_deref()),
                    (Some(subfield), false) => ExtractionRule::nested(&column.field, subfield),
                    (None, false) => ExtractionRule::field(&column.field),
                };
                let rule = match column
                    .scope
                    .as_deref()
                    .and_then(|scope| scope_level(&self.fan_out, scope))
                {
                    Some(level) => rule.at(level),
                    None => rule,
                };
                mapping.column(&column.name, rule)
            });
        mapping.fan_out(self.fan_out.iter().cloned())
    }

    pub fn validate(&self) -> Result<(), JobError> {
        if self.columns.is_empty() {
            return Err(JobError::NoColumns);
        }

        let mut known: HashSet<&str> = HashSet::new();
        for column in &self.columns {
            if column.field.trim().is_empty() {
                return Err(JobError::EmptyField(column.name.clone()));
            }
            if !known.insert(column.name.as_str()) {
                return Err(JobError::DuplicateColumn(column.name.clone()));
            }
            if let Some(scope) = &column.scope {
                if scope_level(&self.fan_out, scope).is_none() {
                    return Err(JobError::UnknownScope {
                        column: column.name.clone(),
                        scope: scope.clone(),
                    });
                }
            }
        }

        // Transforms may read columns written by earlier transforms.
        for transform in &self.transforms {
            for input in transform.inputs() {
                if !known.contains(input) {
                    return Err(JobError::UnknownColumn {
                        what: "transform",
                        column: input.to_string(),
                    });
                }
            }
            known.insert(transform.target());
        }

        for column in self.measures.keys() {
            if !known.contains(column.as_str()) {
                return Err(JobError::UnknownColumn {
                    what: "measure",
                    column: column.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Scope name for the top-level record.
pub const ROOT_SCOPE: &str = "root";

/// Fan-out level a scope name refers to.
fn scope_level(fan_out: &[String], scope: &str) -> Option<usize> {
    if scope == ROOT_SCOPE {
        return Some(0);
    }
    let parts: Vec<&str> = scope.split('.').collect();
    if parts.len() == 1 {
        return fan_out.iter().position(|field| field == scope).map(|i| i + 1);
    }
    let is_prefix = parts.len() <= fan_out.len()
        && parts.iter().zip(fan_out).all(|(part, field)| *part == field.as_str());
    is_prefix.then_some(parts.len())
}
