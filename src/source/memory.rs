//! In-memory and file-backed record sources.

use super::{PageSource, SourceError};
use crate::record::RawRecord;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Serves pages out of an already-loaded record list.
///
/// Also reads saved query responses from disk, which is how the CLI runs a
/// job without a live ERP connection.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<RawRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    /// Parse records out of a JSON document.
    ///
    /// Accepts a bare array of records, a `{"records": [...]}` search
    /// result, or a JSON-RPC envelope `{"result": {"records": [...]}}`.
    /// A non-null JSON-RPC `error` member is reported as a request failure.
    pub fn from_json_str(json: &str) -> Result<Self, SourceError> {
        let value: Value = serde_json::from_str(json)?;
        let records = extract_records(value)?;
        Ok(Self::new(records))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl PageSource for MemorySource {
    fn fetch_page(&mut self, offset: usize, limit: usize) -> Result<Vec<RawRecord>, SourceError> {
        Ok(self
            .records
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn total_count(&mut self) -> Result<Option<usize>, SourceError> {
        Ok(Some(self.records.len()))
    }
}

fn extract_records(value: Value) -> Result<Vec<RawRecord>, SourceError> {
    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .filter_map(|(i, item)| match item {
                Value::Object(map) => Some(RawRecord::from(map)),
                other => {
                    warn!(index = i, "skipping non-object record: {}", other);
                    None
                }
            })
            .collect()),
        Value::Object(mut map) => {
            if let Some(error) = map.remove("error").filter(|error| !error.is_null()) {
                return Err(SourceError::Request(error_message(&error)));
            }
            if let Some(records) = map.remove("records") {
                return extract_records(records);
            }
            if let Some(result) = map.remove("result") {
                return extract_records(result);
            }
            Err(SourceError::Payload(
                "expected an array, 'records' or 'result'".to_string(),
            ))
        }
        other => Err(SourceError::Payload(format!(
            "expected records, found {}",
            type_name(&other)
        ))),
    }
}

fn error_message(error: &Value) -> String {
    error
        .get("data")
        .and_then(|data| data.get("message"))
        .or_else(|| error.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
