//! Batch path: periodic full-directory scan, bulk
//! extract → transform → load → archive.

use std::collections::HashSet;

use log::{error, info, warn};
use tracing::info_span;

use crate::config::Config;
use crate::db::{record_repo, Database};
use crate::error::{Result, StorageError};
use crate::extract;
use crate::record::{transform, validate, ProcessingPath, RawRecord, SalesRecord};
use crate::storage::{FileClaim, LifecycleManager, Zone};
use crate::worker::DirectoryScanner;

use super::report::BatchReport;

pub struct BatchPipeline {
    scanner: DirectoryScanner,
    lifecycle: LifecycleManager,
    db: Database,
}

impl BatchPipeline {
    pub fn new(config: &Config, db: Database) -> Self {
        let scanner = DirectoryScanner::new(&config.paths.input_dir);
        let lifecycle =
            LifecycleManager::new(&config.paths.archive_dir, &config.paths.processed_dir);

        Self {
            scanner,
            lifecycle,
            db,
        }
    }

    /// One full batch run: Idle → Extracting → Transforming → Loading →
    /// Archiving → Idle. Per-file failures are absorbed into counts; only
    /// a store-write failure aborts the run (with every claim returned so
    /// the next scan retries).
    pub fn run(&self) -> Result<BatchReport> {
        let _span = info_span!("batch_run").entered();
        let mut report = BatchReport::default();

        // Extracting
        let files = self.scanner.scan()?;
        report.files_found = files.len() as u64;

        if files.is_empty() {
            info!("No data to process");
            return Ok(report);
        }

        let mut batches: Vec<(FileClaim, Vec<RawRecord>)> = Vec::new();

        for path in &files {
            let claim = match self.lifecycle.claim(path) {
                Ok(claim) => claim,
                Err(StorageError::AlreadyClaimed(_)) => {
                    info!("{} claimed by the stream path, skipping", path.display());
                    report.files_skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Failed to claim {}: {}", path.display(), e);
                    report.files_failed += 1;
                    continue;
                }
            };

            match extract::read_rows(claim.claimed_path()) {
                Ok(extracted) => {
                    info!(
                        "Extracted {} rows from {}",
                        extracted.rows.len(),
                        claim.file_name()
                    );
                    report.files_read += 1;
                    report.rows_read += extracted.rows.len() as u64;
                    report.malformed += extracted.malformed;
                    batches.push((claim, extracted.rows));
                }
                Err(e) => {
                    // Unreadable file: leave it in the input zone for the
                    // next run.
                    warn!("Error reading {}: {}", claim.file_name(), e);
                    report.files_failed += 1;
                    if let Err(ue) = self.lifecycle.unclaim(claim) {
                        error!("Failed to return unreadable file to input zone: {}", ue);
                    }
                }
            }
        }

        if batches.is_empty() {
            info!("Batch run read no files: {}", report);
            return Ok(report);
        }

        // Transforming: drop in-batch duplicate order_ids (first
        // occurrence wins in sorted file order), then validate+transform.
        let mut seen_order_ids: HashSet<String> = HashSet::new();
        let mut records: Vec<SalesRecord> = Vec::new();

        for (claim, rows) in &batches {
            let source_file = claim.file_name();
            for raw in rows {
                if let Some(order_id) = raw.order_id.as_deref().map(str::trim) {
                    if !order_id.is_empty() && !seen_order_ids.insert(order_id.to_string()) {
                        report.batch_duplicates += 1;
                        continue;
                    }
                }

                match validate(raw, source_file) {
                    Ok(valid) => records.push(transform(valid, ProcessingPath::Batch)),
                    Err(reason) => {
                        report.rejects.record(&reason);
                        warn!("Rejected row from {}: {}", source_file, reason);
                    }
                }
            }
        }

        // Loading: a single append for the whole cleaned batch. Written
        // even when zero rows survived, so the run stays observable.
        let source = format!("batch({} files)", report.files_read);
        match record_repo::append(&self.db, &records, &source, ProcessingPath::Batch) {
            Ok(outcome) => {
                report.inserted = outcome.inserted;
                report.store_duplicates = outcome.duplicates;
            }
            Err(e) => {
                error!("Store write failed, returning {} files to input zone: {}", batches.len(), e);
                for (claim, _) in batches {
                    if let Err(ue) = self.lifecycle.unclaim(claim) {
                        error!("File stuck in claimed state: {}", ue);
                    }
                }
                error!("Batch run failed: {}", report);
                return Err(e.into());
            }
        }

        // Archiving: every successfully-read file is retired, including
        // ones that contributed zero valid rows.
        for (claim, _) in batches {
            let name = claim.file_name().to_string();
            match self.lifecycle.release(claim, Zone::Archive) {
                Ok(retired) => {
                    info!("Archived {} as {}", name, retired.display());
                    report.archived += 1;
                }
                Err(e) => {
                    // Records are already durable; the source just was not
                    // retired. Needs operator attention.
                    error!(
                        "Inconsistency: records from {} committed but file not archived: {}",
                        name, e
                    );
                    report.archive_failures += 1;
                }
            }
        }

        info!("Batch run completed: {}", report);
        Ok(report)
    }
}
