//! Record sink trait and end-of-run report types

use crate::normalize::ProductRecord;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur while writing output
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Destination for product records
///
/// Records arrive one at a time in no particular order. The crawl owns its
/// sink and is the only writer.
pub trait RecordSink: Send {
    /// Writes one record
    fn accept(&mut self, record: &ProductRecord) -> SinkResult<()>;

    /// Flushes buffered output once the crawl has ended
    fn finish(&mut self) -> SinkResult<()>;
}

/// Sink that keeps records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<ProductRecord>,
}

impl RecordSink for MemorySink {
    fn accept(&mut self, record: &ProductRecord) -> SinkResult<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> SinkResult<()> {
        Ok(())
    }
}

/// Totals for one crawl run
#[derive(Debug, Clone, Default)]
pub struct SessionReport {
    // Run metadata
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub seed_url: String,
    pub backend: String,
    pub config_hash: String,

    // Traversal
    pub units_processed: u64,
    pub retries_scheduled: u64,
    pub units_abandoned: u64,
    pub units_ignored: u64,
    pub stage_faults: u64,
    pub duplicates_dropped: u64,
    pub offsite_filtered: u64,

    // Records
    pub records_emitted: u64,
    pub failed_records: u64,
    pub records_by_category: BTreeMap<String, u64>,
}

impl SessionReport {
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// Share of product pages that produced a record, as a percentage
    pub fn record_success_rate(&self) -> f64 {
        let attempted = self.records_emitted + self.failed_records;
        if attempted == 0 {
            return 0.0;
        }
        (self.records_emitted as f64 / attempted as f64) * 100.0
    }
}
