//! End-to-end export jobs.
//!
//! A [`Job`] ties the stages together:
//!
//! ```text
//! PageSource → fetch_all → flatten → transforms → aggregate → Sink
//! ```
//!
//! # Example
//!
//! ```ignore
//! use flatsheet::prelude::*;
//!
//! let mapping = ColumnMapping::new()
//!     .field("Order Reference", "name")
//!     .nested("Product", "product_id", "display_name")
//!     .field("Qty", "product_uom_qty")
//!     .fan_out(["order_line"]);
//!
//! let job = Job::new("oa_item", mapping).with_measure("Qty", Measure::Sum);
//! let mut source = MemorySource::from_path("sale_orders.json")?;
//! let mut sink = CsvSink::new(std::io::stdout());
//! let report = job.run(&mut source, &mut sink)?;
//! ```

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, infer_measures, AggregatedTable, Measure};
use crate::config::{JobSettings, Settings, SettingsError};
use crate::flatten::{flatten_all, ColumnMapping};
use crate::record::RawRecord;
use crate::sink::{Sink, SinkError};
use crate::source::{fetch_all, PageSource, RetryPolicy, SourceError};
use crate::table::FlatRow;
use crate::transform::{apply_all, Transform};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that stop a job.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

// ============================================================================
// Job
// ============================================================================

/// Default number of records requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 2000;

/// Format of the run timestamp shown next to an exported table.
pub const LAST_UPDATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One configured export.
#[derive(Debug, Clone)]
pub struct Job {
    name: String,
    mapping: ColumnMapping,
    transforms: Vec<Transform>,
    measures: HashMap<String, Measure>,
    infer_measures: bool,
    page_size: usize,
    retry: RetryPolicy,
    utc_offset: FixedOffset,
}

/// What a finished run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobReport {
    /// Records read from the source.
    pub fetched: usize,
    /// Rows produced by flattening.
    pub flattened: usize,
    /// Rows handed to the sink after aggregation.
    pub written: usize,
    /// When the run finished, in the job's reporting offset.
    pub finished_at: Option<DateTime<FixedOffset>>,
}

impl JobReport {
    /// `Last Updated: <local time>` line for the exported sheet.
    pub fn last_updated(&self) -> Option<String> {
        self.finished_at
            .map(|at| format!("Last Updated: {}", at.format(LAST_UPDATED_FORMAT)))
    }
}

impl Job {
    pub fn new(name: impl Into<String>, mapping: ColumnMapping) -> Self {
        Self {
            name: name.into(),
            mapping,
            transforms: Vec::new(),
            measures: HashMap::new(),
            infer_measures: false,
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::default(),
            utc_offset: Utc.fix(),
        }
    }

    /// Build the named job out of loaded settings.
    pub fn from_settings(settings: &Settings, name: &str) -> Result<Self, SettingsError> {
        let job = settings.get_job(name)?;
        job.validate()
            .map_err(|err| SettingsError::InvalidConfig(format!("job '{}': {}", name, err)))?;
        Ok(Self::from_job_settings(name, job)
            .with_page_size(settings.source.page_size)
            .with_retry(settings.retry.policy())
            .with_utc_offset(settings.report.offset()?))
    }

    fn from_job_settings(name: &str, job: &JobSettings) -> Self {
        Self {
            name: name.to_string(),
            mapping: job.mapping(),
            transforms: job.transforms.clone(),
            measures: job
                .measures
                .iter()
                .map(|(column, measure)| (column.clone(), *measure))
                .collect(),
            infer_measures: job.infer_measures,
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::default(),
            utc_offset: Utc.fix(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn with_measure(mut self, column: impl Into<String>, measure: Measure) -> Self {
        self.measures.insert(column.into(), measure);
        self
    }

    pub fn with_inferred_measures(mut self, infer: bool) -> Self {
        self.infer_measures = infer;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Offset the run timestamp is reported in.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    /// Run the pure stages over records already in hand.
    pub fn process(&self, records: &[RawRecord]) -> AggregatedTable {
        self.stages(records).1
    }

    /// Fetch every record, process them, and hand the result to `sink`.
    ///
    /// An empty result leaves the sink untouched.
    pub fn run(&self, source: &mut dyn PageSource, sink: &mut dyn Sink) -> PipelineResult<JobReport> {
        info!(job = %self.name, page_size = self.page_size, "starting job");

        let records = fetch_all(source, self.page_size, &self.retry)?;
        let mut report = JobReport {
            fetched: records.len(),
            ..JobReport::default()
        };

        let (flattened, table) = self.stages(&records);
        report.flattened = flattened;

        if table.is_empty() {
            warn!(job = %self.name, "no rows to write, leaving output untouched");
            report.finished_at = Some(self.now());
            return Ok(report);
        }

        sink.write_table(&table.to_table())?;
        report.written = table.len();
        report.finished_at = Some(self.now());

        info!(
            job = %self.name,
            fetched = report.fetched,
            flattened = report.flattened,
            written = report.written,
            "job finished"
        );
        Ok(report)
    }

    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.utc_offset)
    }

    /// Returns the flattened row count alongside the aggregated table.
    fn stages(&self, records: &[RawRecord]) -> (usize, AggregatedTable) {
        let mut rows = flatten_all(records, &self.mapping);
        apply_all(&self.transforms, &mut rows);

        let measures = self.measures_for(&rows);
        debug!(job = %self.name, rows = rows.len(), measures = measures.len(), "aggregating");
        (rows.len(), aggregate(&rows, &measures))
    }

    /// Explicit measures, plus inferred sums for unlisted numeric columns.
    fn measures_for(&self, rows: &[FlatRow]) -> HashMap<String, Measure> {
        let mut measures = if self.infer_measures {
            infer_measures(rows)
        } else {
            HashMap::new()
        };
        measures.extend(self.measures.iter().map(|(k, v)| (k.clone(), *v)));
        measures
    }
}
