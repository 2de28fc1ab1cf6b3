//! Run-wide crawl counters

use crate::output::SessionReport;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Counters for one crawl run
///
/// A session is created (or reset) when a crawl starts and is shared by
/// reference with every task of that crawl. Nothing outside the run reads it
/// until [`CrawlSession::report`] takes a snapshot.
#[derive(Debug)]
pub struct CrawlSession {
    started_at: Mutex<DateTime<Utc>>,
    units_processed: AtomicU64,
    records_emitted: AtomicU64,
    failed_records: AtomicU64,
    retries_scheduled: AtomicU64,
    units_abandoned: AtomicU64,
    units_ignored: AtomicU64,
    stage_faults: AtomicU64,
    duplicates_dropped: AtomicU64,
    offsite_filtered: AtomicU64,
    records_by_category: Mutex<BTreeMap<String, u64>>,
}

/// Label used for records that carry no category
pub const UNCATEGORIZED: &str = "(none)";

impl CrawlSession {
    pub fn new() -> Self {
        Self {
            started_at: Mutex::new(Utc::now()),
            units_processed: AtomicU64::new(0),
            records_emitted: AtomicU64::new(0),
            failed_records: AtomicU64::new(0),
            retries_scheduled: AtomicU64::new(0),
            units_abandoned: AtomicU64::new(0),
            units_ignored: AtomicU64::new(0),
            stage_faults: AtomicU64::new(0),
            duplicates_dropped: AtomicU64::new(0),
            offsite_filtered: AtomicU64::new(0),
            records_by_category: Mutex::new(BTreeMap::new()),
        }
    }

    /// Zeroes every counter and restarts the clock
    pub fn reset(&self) {
        for counter in [
            &self.units_processed,
            &self.records_emitted,
            &self.failed_records,
            &self.retries_scheduled,
            &self.units_abandoned,
            &self.units_ignored,
            &self.stage_faults,
            &self.duplicates_dropped,
            &self.offsite_filtered,
        ] {
            counter.store(0, Ordering::Relaxed);
        }

        if let Ok(mut started_at) = self.started_at.lock() {
            *started_at = Utc::now();
        }
        if let Ok(mut by_category) = self.records_by_category.lock() {
            by_category.clear();
        }
    }

    /// A rendered page was handed to its stage parser
    pub fn record_processed(&self) -> u64 {
        self.units_processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// A product record reached the sink
    pub fn record_emitted(&self, category: Option<&str>) {
        self.records_emitted.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut by_category) = self.records_by_category.lock() {
            *by_category
                .entry(category.unwrap_or(UNCATEGORIZED).to_string())
                .or_insert(0) += 1;
        }
    }

    /// A raw record was rejected by normalization or could not be written
    pub fn record_failed(&self) {
        self.failed_records.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    /// A unit exhausted its retry budget
    pub fn record_abandoned(&self) {
        self.units_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    /// A unit failed in a way that is never retried
    pub fn record_ignored(&self) {
        self.units_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stage_fault(&self) {
        self.stage_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_offsite(&self) {
        self.offsite_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed_records(&self) -> u64 {
        self.failed_records.load(Ordering::Relaxed)
    }

    pub fn records_emitted(&self) -> u64 {
        self.records_emitted.load(Ordering::Relaxed)
    }

    pub fn units_processed(&self) -> u64 {
        self.units_processed.load(Ordering::Relaxed)
    }

    /// Snapshot of the counters, stamped with the current time as finish time
    pub fn report(&self) -> SessionReport {
        let started_at = self
            .started_at
            .lock()
            .map(|started_at| *started_at)
            .unwrap_or_else(|_| Utc::now());
        let records_by_category = self
            .records_by_category
            .lock()
            .map(|by_category| by_category.clone())
            .unwrap_or_default();

        SessionReport {
            started_at,
            finished_at: Some(Utc::now()),
            units_processed: self.units_processed.load(Ordering::Relaxed),
            records_emitted: self.records_emitted.load(Ordering::Relaxed),
            failed_records: self.failed_records.load(Ordering::Relaxed),
            retries_scheduled: self.retries_scheduled.load(Ordering::Relaxed),
            units_abandoned: self.units_abandoned.load(Ordering::Relaxed),
            units_ignored: self.units_ignored.load(Ordering::Relaxed),
            stage_faults: self.stage_faults.load(Ordering::Relaxed),
            duplicates_dropped: self.duplicates_dropped.load(Ordering::Relaxed),
            offsite_filtered: self.offsite_filtered.load(Ordering::Relaxed),
            records_by_category,
            ..SessionReport::default()
        }
    }
}

impl Default for CrawlSession {
    fn default() -> Self {
        Self::new()
    }
}
