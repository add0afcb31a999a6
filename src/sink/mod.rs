//! Table sinks.
//!
//! A sink receives a header-plus-rows [`Table`] and replaces whatever it
//! held before. The spreadsheet upload is an external concern; the sinks
//! here write CSV or JSON to any writer or file.

use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Destination for a finished table.
pub trait Sink {
    fn write_table(&mut self, table: &Table) -> Result<(), SinkError>;
}

/// Output encodings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => f.write_str("csv"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {}", other)),
        }
    }
}

/// Writes a header row and data rows as CSV.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
        }
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|err| SinkError::Io(err.into_error()))
    }
}

impl<W: Write> Sink for CsvSink<W> {
    fn write_table(&mut self, table: &Table) -> Result<(), SinkError> {
        self.writer.write_record(table.header())?;
        for row in table.rows() {
            self.writer
                .write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        self.writer.flush()?;
        debug!(rows = table.len(), "wrote csv table");
        Ok(())
    }
}

/// Writes the table as a JSON array of objects keyed by header.
pub struct JsonSink<W: Write> {
    inner: W,
    pretty: bool,
}

impl<W: Write> JsonSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            pretty: true,
        }
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Sink for JsonSink<W> {
    fn write_table(&mut self, table: &Table) -> Result<(), SinkError> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.inner, table)?;
        } else {
            serde_json::to_writer(&mut self.inner, table)?;
        }
        self.inner.write_all(b"\n")?;
        self.inner.flush()?;
        debug!(rows = table.len(), "wrote json table");
        Ok(())
    }
}

/// Open a sink that replaces the file at `path`.
pub fn file_sink<P: AsRef<Path>>(path: P, format: OutputFormat) -> Result<Box<dyn Sink>, SinkError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = BufWriter::new(File::create(path)?);
    Ok(match format {
        OutputFormat::Csv => Box::new(CsvSink::new(file)),
        OutputFormat::Json => Box::new(JsonSink::new(file)),
    })
}

/// Sink writing to standard output.
pub fn stdout_sink(format: OutputFormat) -> Box<dyn Sink> {
    match format {
        OutputFormat::Csv => Box::new(CsvSink::new(io::stdout())),
        OutputFormat::Json => Box::new(JsonSink::new(io::stdout())),
    }
}
