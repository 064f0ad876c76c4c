//! Run reports. Every run surfaces its counts, success or failure.

use std::path::PathBuf;

use crate::record::RejectReason;

/// Per-reason rejection counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RejectCounts {
    pub missing_field: u64,
    pub not_numeric: u64,
    pub invalid_date: u64,
}

impl RejectCounts {
    pub fn record(&mut self, reason: &RejectReason) {
        match reason {
            RejectReason::MissingField(_) => self.missing_field += 1,
            RejectReason::NotNumeric(_) => self.not_numeric += 1,
            RejectReason::InvalidDate => self.invalid_date += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.missing_field + self.not_numeric + self.invalid_date
    }
}

impl std::fmt::Display for RejectCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "missing_field={} not_numeric={} invalid_date={}",
            self.missing_field, self.not_numeric, self.invalid_date
        )
    }
}

/// Counts for one batch run.
#[derive(Debug, Default, Clone)]
pub struct BatchReport {
    pub files_found: u64,
    pub files_read: u64,
    /// Files that lost the claim race to the stream path.
    pub files_skipped: u64,
    /// Files that could not be read; left in place for the next run.
    pub files_failed: u64,
    pub rows_read: u64,
    pub malformed: u64,
    pub rejects: RejectCounts,
    /// Duplicate order_ids dropped within this batch (first wins).
    pub batch_duplicates: u64,
    pub inserted: u64,
    /// Duplicates absorbed by the store's order_id constraint.
    pub store_duplicates: u64,
    pub archived: u64,
    pub archive_failures: u64,
}

impl BatchReport {
    /// All duplicates observed in this run, in-batch and in-store.
    pub fn duplicates(&self) -> u64 {
        self.batch_duplicates + self.store_duplicates
    }
}

impl std::fmt::Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "files found={} read={} skipped={} failed={} | rows read={} malformed={} \
             rejected=[{}] duplicates={} | inserted={} | archived={} archive_failures={}",
            self.files_found,
            self.files_read,
            self.files_skipped,
            self.files_failed,
            self.rows_read,
            self.malformed,
            self.rejects,
            self.duplicates(),
            self.inserted,
            self.archived,
            self.archive_failures,
        )
    }
}

/// Counts for one stream-processed file.
#[derive(Debug, Default, Clone)]
pub struct StreamReport {
    pub source_file: String,
    pub rows_read: u64,
    pub malformed: u64,
    pub rejects: RejectCounts,
    pub inserted: u64,
    pub duplicates: u64,
    /// Terminal location after release into the processed zone.
    pub retired_to: Option<PathBuf>,
}

impl std::fmt::Display for StreamReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: rows read={} malformed={} rejected=[{}] inserted={} duplicates={}",
            self.source_file,
            self.rows_read,
            self.malformed,
            self.rejects,
            self.inserted,
            self.duplicates,
        )
    }
}
