use chrono::Utc;

use crate::record::schema::{ProcessingPath, SalesRecord, ValidRecord};

/// Derives the persisted record from a validated row: total_amount is
/// recomputed from quantity and unit_price (any total supplied in the
/// source file has already been discarded), processed_at is stamped with
/// the current time and processing_path with the calling route.
pub fn transform(record: ValidRecord, path: ProcessingPath) -> SalesRecord {
    let total_amount = record.quantity as f64 * record.unit_price;

    SalesRecord {
        order_id: record.order_id,
        product: record.product,
        quantity: record.quantity,
        unit_price: record.unit_price,
        total_amount,
        region: record.region,
        sales_rep: record.sales_rep,
        order_date: record.order_date,
        customer_id: record.customer_id,
        source_file: record.source_file,
        processed_at: Utc::now(),
        processing_path: path,
    }
}
