//! Stream path: event-triggered single-file
//! extract → per-record transform → load → archive.

use std::path::Path;

use log::{debug, error, info, warn};
use tracing::info_span;

use crate::config::Config;
use crate::db::{record_repo, Database};
use crate::error::{Result, StorageError};
use crate::extract;
use crate::record::{transform, validate, ProcessingPath, SalesRecord};
use crate::storage::{LifecycleManager, Zone};

use super::report::StreamReport;

pub struct StreamPipeline {
    lifecycle: LifecycleManager,
    db: Database,
}

impl StreamPipeline {
    pub fn new(config: &Config, db: Database) -> Self {
        let lifecycle =
            LifecycleManager::new(&config.paths.archive_dir, &config.paths.processed_dir);
        Self { lifecycle, db }
    }

    /// Processes one settled file arrival. Returns `Ok(None)` when the
    /// batch path claimed the file first. A row failing validation is
    /// dropped and never aborts the file. On a store-write failure the
    /// claim is released back to `arrived` so the next batch scan
    /// retries the file (dedup on order_id makes that safe).
    pub fn process_file(&self, path: &Path) -> Result<Option<StreamReport>> {
        let _span = info_span!("stream_file", path = %path.display()).entered();

        let claim = match self.lifecycle.claim(path) {
            Ok(claim) => claim,
            Err(StorageError::AlreadyClaimed(_)) => {
                debug!("{} already claimed, skipping", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let mut report = StreamReport {
            source_file: claim.file_name().to_string(),
            ..Default::default()
        };

        // Extracting
        let extracted = match extract::read_rows(claim.claimed_path()) {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!("Error reading {}: {}", report.source_file, e);
                if let Err(ue) = self.lifecycle.unclaim(claim) {
                    error!("Failed to return unreadable file to input zone: {}", ue);
                }
                return Err(e.into());
            }
        };
        report.rows_read = extracted.rows.len() as u64;
        report.malformed = extracted.malformed;

        // Per-record transform; partial success is the norm.
        let mut records: Vec<SalesRecord> = Vec::with_capacity(extracted.rows.len());
        for raw in &extracted.rows {
            match validate(raw, &report.source_file) {
                Ok(valid) => records.push(transform(valid, ProcessingPath::Stream)),
                Err(reason) => {
                    report.rejects.record(&reason);
                    warn!("Rejected row from {}: {}", report.source_file, reason);
                }
            }
        }

        // Loading: one append per file, also when zero rows survived.
        match record_repo::append(&self.db, &records, &report.source_file, ProcessingPath::Stream)
        {
            Ok(outcome) => {
                report.inserted = outcome.inserted;
                report.duplicates = outcome.duplicates;
            }
            Err(e) => {
                error!(
                    "Store write failed for {}, returning file to input zone: {}",
                    report.source_file, e
                );
                if let Err(ue) = self.lifecycle.unclaim(claim) {
                    error!("File stuck in claimed state: {}", ue);
                }
                error!("Stream run failed: {}", report);
                return Err(e.into());
            }
        }

        info!("Stream run completed: {}", report);

        // Archiving happens only after the append committed.
        match self.lifecycle.release(claim, Zone::Processed) {
            Ok(retired) => {
                info!("Moved {} to {}", report.source_file, retired.display());
                report.retired_to = Some(retired);
                Ok(Some(report))
            }
            Err(e) => {
                // Records are durable but the source file was not retired.
                error!(
                    "Inconsistency: records from {} committed but file not retired: {}",
                    report.source_file, e
                );
                Err(e.into())
            }
        }
    }
}
