//! Upstream record sources and the pagination loop.
//!
//! The ERP client itself lives outside this crate. Anything that can
//! answer an offset/limit query implements [`PageSource`]; [`fetch_all`]
//! walks the pages in order until a short page marks the end.

mod memory;
mod retry;

pub use memory::MemorySource;
pub use retry::RetryPolicy;

use crate::record::RawRecord;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while fetching records.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read source file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse records: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unexpected payload: {0}")]
    Payload(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Invalid page size: {0}")]
    InvalidPageSize(usize),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<SourceError>,
    },
}

/// A paginated query over upstream records.
pub trait PageSource {
    /// Fetch up to `limit` records starting at `offset`.
    fn fetch_page(&mut self, offset: usize, limit: usize) -> Result<Vec<RawRecord>, SourceError>;

    /// Total number of matching records, when the source can tell cheaply.
    fn total_count(&mut self) -> Result<Option<usize>, SourceError> {
        Ok(None)
    }
}

/// Fetch every page, in order, until a page comes back short.
///
/// Each page request goes through `retry`; running out of attempts on any
/// page fails the whole fetch.
pub fn fetch_all<S>(
    source: &mut S,
    page_size: usize,
    retry: &RetryPolicy,
) -> Result<Vec<RawRecord>, SourceError>
where
    S: PageSource + ?Sized,
{
    if page_size == 0 {
        return Err(SourceError::InvalidPageSize(page_size));
    }

    let expected = retry.run("count records", || source.total_count())?;
    if let Some(total) = expected {
        info!(total, "records to fetch");
    }

    let mut records = Vec::new();
    let mut offset = 0;
    loop {
        let page = retry.run("fetch page", || source.fetch_page(offset, page_size))?;
        let fetched = page.len();
        records.extend(page);
        debug!(offset, fetched, total = records.len(), "fetched page");

        if fetched < page_size {
            break;
        }
        offset += page_size;
    }

    info!(total = records.len(), "finished fetching");
    Ok(records)
}
