//! Sales-record repository: the store gateway's write and read paths.
//!
//! `append` is the only sanctioned way records reach the store. It is
//! transactional: either every accepted record and the audit row commit
//! together, or nothing does.

use rusqlite::params;

use super::{log_repo, Database, DatabaseError};
use crate::record::{ProcessingPath, SalesRecord};

/// Result of one `append` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    pub inserted: u64,
    pub duplicates: u64,
}

/// Aggregate store summary.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub total_records: u64,
    pub paths: Vec<PathStats>,
}

/// Per-path aggregates from the processing log.
#[derive(Debug, Clone)]
pub struct PathStats {
    pub processing_type: String,
    pub runs: u64,
    pub records: u64,
}

/// Appends records with dedup on `order_id`. A record whose order_id
/// already exists (in the store or earlier in this same call) counts as a
/// duplicate, not an error. Exactly one processing_log row is written per
/// call, also when `records` is empty, so "ran but found nothing new"
/// stays observable.
pub fn append(
    db: &Database,
    records: &[SalesRecord],
    source: &str,
    path: ProcessingPath,
) -> Result<AppendOutcome, DatabaseError> {
    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;
        let mut outcome = AppendOutcome::default();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO sales_records (order_id, product, quantity, unit_price,
                 total_amount, region, sales_rep, order_date, customer_id, source_file,
                 processed_at, processing_path)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(order_id) DO NOTHING",
            )?;

            for record in records {
                let changed = stmt.execute(params![
                    record.order_id,
                    record.product,
                    record.quantity,
                    record.unit_price,
                    record.total_amount,
                    record.region,
                    record.sales_rep,
                    record.order_date.to_string(),
                    record.customer_id,
                    record.source_file,
                    record.processed_at.to_rfc3339(),
                    record.processing_path.as_str(),
                ])?;

                if changed == 1 {
                    outcome.inserted += 1;
                } else {
                    outcome.duplicates += 1;
                }
            }
        }

        log_repo::insert_in_tx(&tx, source, outcome.inserted, path, "success")?;
        tx.commit()?;

        Ok(outcome)
    })
}

/// Returns the total record count plus per-path run/record aggregates.
pub fn stats(db: &Database) -> Result<StoreStats, DatabaseError> {
    db.with_conn(|conn| {
        let total_records: u64 =
            conn.query_row("SELECT COUNT(*) FROM sales_records", [], |r| r.get(0))?;

        let mut stmt = conn.prepare(
            "SELECT processing_type, COUNT(*), COALESCE(SUM(records_processed), 0)
             FROM processing_log GROUP BY processing_type ORDER BY processing_type",
        )?;
        let paths: Vec<PathStats> = stmt
            .query_map([], |row| {
                Ok(PathStats {
                    processing_type: row.get(0)?,
                    runs: row.get(1)?,
                    records: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StoreStats {
            total_records,
            paths,
        })
    })
}
