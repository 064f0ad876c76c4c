//! Processing-log repository: the append-only audit trail.

use chrono::Utc;
use rusqlite::{params, Transaction};

use super::{Database, DatabaseError};
use crate::record::ProcessingPath;

/// A raw processing_log row.
#[derive(Debug, Clone)]
pub struct ProcessingLogRow {
    pub id: i64,
    pub filename: String,
    pub records_processed: i64,
    pub processing_type: String,
    pub timestamp: String,
    pub status: String,
}

/// Inserts one audit row inside the caller's transaction, so the log
/// entry commits or rolls back together with the records it describes.
pub fn insert_in_tx(
    tx: &Transaction<'_>,
    filename: &str,
    records_processed: u64,
    path: ProcessingPath,
    status: &str,
) -> Result<(), DatabaseError> {
    tx.execute(
        "INSERT INTO processing_log (filename, records_processed, processing_type, timestamp, status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            filename,
            records_processed as i64,
            path.as_str(),
            Utc::now().to_rfc3339(),
            status,
        ],
    )?;
    Ok(())
}

/// Lists all audit rows, newest first.
pub fn list(db: &Database) -> Result<Vec<ProcessingLogRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT id, filename, records_processed, processing_type, timestamp, status
             FROM processing_log ORDER BY id DESC",
        )?;
        let rows: Vec<ProcessingLogRow> = stmt
            .query_map([], |row| {
                Ok(ProcessingLogRow {
                    id: row.get(0)?,
                    filename: row.get(1)?,
                    records_processed: row.get(2)?,
                    processing_type: row.get(3)?,
                    timestamp: row.get(4)?,
                    status: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_list() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            insert_in_tx(&tx, "a.csv", 5, ProcessingPath::Stream, "success")?;
            insert_in_tx(&tx, "b.csv", 0, ProcessingPath::Batch, "success")?;
            tx.commit()?;
            Ok(())
        })
        .unwrap();

        let rows = list(&db).unwrap();
        assert_eq!(rows.len(), 2);
        // Newest first.
        assert_eq!(rows[0].filename, "b.csv");
        assert_eq!(rows[0].records_processed, 0);
        assert_eq!(rows[1].processing_type, "stream");
    }

    #[test]
    fn test_rollback_discards_entry() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            insert_in_tx(&tx, "a.csv", 5, ProcessingPath::Batch, "success")?;
            // Dropped without commit.
            Ok(())
        })
        .unwrap();

        assert!(list(&db).unwrap().is_empty());
    }
}
