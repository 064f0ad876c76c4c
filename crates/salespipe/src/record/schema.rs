use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

/// Which ingestion route produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingPath {
    Batch,
    Stream,
}

impl ProcessingPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingPath::Batch => "batch",
            ProcessingPath::Stream => "stream",
        }
    }
}

impl std::fmt::Display for ProcessingPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One CSV row exactly as read from disk. Every column is optional so a
/// short or drifted row surfaces as a validation rejection instead of a
/// silent NULL insert downstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub unit_price: Option<String>,
    /// Ignored on ingest; the transform stage recomputes it.
    #[serde(default)]
    pub total_amount: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub sales_rep: Option<String>,
    #[serde(default)]
    pub order_date: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
}

/// A row that passed validation. Derived fields (total_amount,
/// processed_at, processing_path) are not present yet; only the transform
/// stage can produce them.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRecord {
    pub order_id: String,
    pub product: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub region: Option<String>,
    pub sales_rep: Option<String>,
    pub order_date: NaiveDate,
    pub customer_id: Option<String>,
    pub source_file: String,
}

/// The canonical persisted record. Append-only: never mutated after the
/// store gateway accepts it.
#[derive(Debug, Clone)]
pub struct SalesRecord {
    pub order_id: String,
    pub product: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub total_amount: f64,
    pub region: Option<String>,
    pub sales_rep: Option<String>,
    pub order_date: NaiveDate,
    pub customer_id: Option<String>,
    pub source_file: String,
    pub processed_at: DateTime<Utc>,
    pub processing_path: ProcessingPath,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_path_as_str() {
        assert_eq!(ProcessingPath::Batch.as_str(), "batch");
        assert_eq!(ProcessingPath::Stream.as_str(), "stream");
        assert_eq!(ProcessingPath::Stream.to_string(), "stream");
    }

    #[test]
    fn test_raw_record_default_is_all_none() {
        let raw = RawRecord::default();
        assert!(raw.order_id.is_none());
        assert!(raw.total_amount.is_none());
    }
}
