//! # flatsheet
//!
//! Flattens nested ERP query results into spreadsheet-ready tables.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          PageSource (paged upstream query)               │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [source::fetch_all + retry]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  RawRecord list                          │
//! │   (scalars, [id, label] pairs, sub-records, lists)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [flatten + resolve]
//! ┌─────────────────────────────────────────────────────────┐
//! │         FlatRow list (one row per fan-out leaf)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [transform + aggregate]
//! ┌─────────────────────────────────────────────────────────┐
//! │            AggregatedTable → Table → Sink                │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything between the source and the sink is pure.

pub mod aggregate;
pub mod config;
pub mod flatten;
pub mod pipeline;
pub mod record;
pub mod resolve;
pub mod sink;
pub mod source;
pub mod table;
pub mod transform;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::aggregate::{aggregate, infer_measures, AggregatedTable, Measure};
    pub use crate::config::{JobSettings, Settings, SettingsError};
    pub use crate::flatten::{
        flatten, flatten_all, ColumnMapping, ExtractionRule, RecordView, RuleError, Scope,
    };
    pub use crate::pipeline::{Job, JobReport, PipelineError};
    pub use crate::record::{Cell, RawRecord, RawValue, Scalar};
    pub use crate::resolve::{resolve, resolve_cell};
    pub use crate::sink::{CsvSink, JsonSink, OutputFormat, Sink, SinkError};
    pub use crate::source::{fetch_all, MemorySource, PageSource, RetryPolicy, SourceError};
    pub use crate::table::{FlatRow, Table};
    pub use crate::transform::Transform;
}

// Also export at crate root for convenience
pub use flatten::{flatten, ColumnMapping, ExtractionRule};
pub use pipeline::{Job, JobReport, PipelineError};
pub use record::{Cell, RawRecord, RawValue};
pub use resolve::resolve;
pub use table::{FlatRow, Table};
