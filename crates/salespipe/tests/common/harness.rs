//! Test harness for isolated pipeline execution.

#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;

use salespipe::config::{load_config_from_str, Config};
use salespipe::db::{log_repo, record_repo, Database};
use salespipe::db::{ProcessingLogRow, StoreStats};
use salespipe::pipeline::{BatchPipeline, StreamPipeline};
use salespipe::storage::LifecycleManager;

pub const CSV_HEADER: &str =
    "order_id,product,quantity,unit_price,region,sales_rep,order_date,customer_id\n";

/// Isolated environment: temp zone directories plus an in-memory store.
pub struct TestHarness {
    temp_dir: TempDir,
    pub config: Config,
    pub db: Database,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path().display();

        let config = load_config_from_str(&format!(
            r#"
paths:
  input_dir: {base}/input
  archive_dir: {base}/archive
  processed_dir: {base}/processed
  log_dir: {base}/logs
database:
  path: {base}/sales.db
batch:
  interval_secs: 3600
stream:
  debounce_ms: 100
"#
        ))
        .expect("Failed to build test config");

        std::fs::create_dir_all(&config.paths.input_dir).expect("Failed to create input dir");

        let db = Database::open_in_memory().expect("Failed to open store");

        Self {
            temp_dir,
            config,
            db,
        }
    }

    pub fn batch_pipeline(&self) -> BatchPipeline {
        BatchPipeline::new(&self.config, self.db.clone())
    }

    pub fn stream_pipeline(&self) -> StreamPipeline {
        StreamPipeline::new(&self.config, self.db.clone())
    }

    pub fn lifecycle(&self) -> LifecycleManager {
        LifecycleManager::new(&self.config.paths.archive_dir, &self.config.paths.processed_dir)
    }

    /// Writes a CSV file with the standard header into the input zone.
    pub fn write_csv(&self, name: &str, body: &str) -> PathBuf {
        let path = self.config.paths.input_dir.join(name);
        std::fs::write(&path, format!("{}{}", CSV_HEADER, body)).expect("Failed to write fixture");
        path
    }

    /// Writes raw bytes into the input zone, header included by the caller.
    pub fn write_raw(&self, name: &str, content: &str) -> PathBuf {
        let path = self.config.paths.input_dir.join(name);
        std::fs::write(&path, content).expect("Failed to write fixture");
        path
    }

    pub fn input_files(&self) -> Vec<PathBuf> {
        list_dir(&self.config.paths.input_dir)
    }

    pub fn archive_files(&self) -> Vec<PathBuf> {
        list_dir(&self.config.paths.archive_dir)
    }

    pub fn processed_files(&self) -> Vec<PathBuf> {
        list_dir(&self.config.paths.processed_dir)
    }

    pub fn stats(&self) -> StoreStats {
        record_repo::stats(&self.db).expect("Failed to query stats")
    }

    pub fn processing_log(&self) -> Vec<ProcessingLogRow> {
        log_repo::list(&self.db).expect("Failed to query processing log")
    }

    /// order_ids currently in the store, sorted.
    pub fn stored_order_ids(&self) -> Vec<String> {
        self.db
            .with_conn(|conn| {
                let mut stmt =
                    conn.prepare("SELECT order_id FROM sales_records ORDER BY order_id")?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                let mut ids = Vec::new();
                for id in rows {
                    ids.push(id?);
                }
                Ok(ids)
            })
            .expect("Failed to query order_ids")
    }
}

fn list_dir(dir: &std::path::Path) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .expect("Failed to read dir")
        .map(|e| e.expect("Failed to read entry").path())
        .collect();
    entries.sort();
    entries
}

/// A well-formed row with the given order id.
pub fn row(order_id: &str) -> String {
    format!("{order_id},Laptop,2,499.99,North,Alice Johnson,2026-01-15,CUST-1001\n")
}
