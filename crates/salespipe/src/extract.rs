//! CSV extraction: reads a single source file into raw rows.

use std::path::Path;

use log::warn;

use crate::error::ExtractError;
use crate::record::RawRecord;

/// Rows extracted from one file, plus the count of lines the CSV reader
/// could not deserialize (those are dropped, not fatal).
#[derive(Debug)]
pub struct Extracted {
    pub rows: Vec<RawRecord>,
    pub malformed: u64,
}

/// Reads a CSV file with a header row into raw records. A row the reader
/// cannot deserialize is logged and skipped; a file that cannot be opened
/// or whose header cannot be read is an `ExtractError` for the caller to
/// absorb (the file stays in place for a later retry).
pub fn read_rows(path: &Path) -> Result<Extracted, ExtractError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| ExtractError::OpenFile {
            path: path.to_path_buf(),
            source: e,
        })?;

    // Force the header read so an empty/truncated file fails here, not
    // row by row.
    reader.headers().map_err(|e| ExtractError::ReadHeader {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut rows = Vec::new();
    let mut malformed = 0u64;

    for result in reader.deserialize::<RawRecord>() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                warn!("Skipping malformed row in {}: {}", path.display(), e);
                malformed += 1;
            }
        }
    }

    Ok(Extracted { rows, malformed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str =
        "order_id,product,quantity,unit_price,region,sales_rep,order_date,customer_id\n";

    fn write_csv(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, format!("{}{}", HEADER, body)).unwrap();
        path
    }

    #[test]
    fn test_read_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "sales.csv",
            "ORD-1,Laptop,2,499.99,North,Alice Johnson,2026-01-15,CUST-1001\n\
             ORD-2,Mouse,1,25.00,South,Bob Smith,2026-01-16,CUST-1002\n",
        );

        let extracted = read_rows(&path).unwrap();
        assert_eq!(extracted.rows.len(), 2);
        assert_eq!(extracted.malformed, 0);
        assert_eq!(extracted.rows[0].order_id.as_deref(), Some("ORD-1"));
        assert_eq!(extracted.rows[1].unit_price.as_deref(), Some("25.00"));
    }

    #[test]
    fn test_short_row_still_deserializes() {
        // flexible mode: missing trailing columns become None and are the
        // validator's problem, not the reader's.
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "short.csv", "ORD-3,Keyboard,1\n");

        let extracted = read_rows(&path).unwrap();
        assert_eq!(extracted.rows.len(), 1);
        assert!(extracted.rows[0].unit_price.is_none());
        assert!(extracted.rows[0].order_date.is_none());
    }

    #[test]
    fn test_header_only_file_yields_no_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "empty.csv", "");

        let extracted = read_rows(&path).unwrap();
        assert!(extracted.rows.is_empty());
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = read_rows(&dir.path().join("nope.csv"));
        assert!(matches!(result, Err(ExtractError::OpenFile { .. })));
    }

    #[test]
    fn test_whitespace_trimmed() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "ws.csv",
            "ORD-4 , Tablet , 2 , 10.00 ,,, 2026-02-01 ,\n",
        );

        let extracted = read_rows(&path).unwrap();
        assert_eq!(extracted.rows[0].order_id.as_deref(), Some("ORD-4"));
        assert_eq!(extracted.rows[0].quantity.as_deref(), Some("2"));
    }
}
