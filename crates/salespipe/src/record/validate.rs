use chrono::NaiveDate;
use thiserror::Error;

use crate::record::schema::{RawRecord, ValidRecord};

/// Why a row was dropped. Rejections are counted, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{0}' is not an acceptable number")]
    NotNumeric(&'static str),

    #[error("field 'order_date' is not a valid date")]
    InvalidDate,
}

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validates a raw CSV row. Accepts only rows where order_id, product,
/// quantity, unit_price and order_date are present, quantity parses as an
/// integer >= 1, unit_price as a number >= 0 and order_date as a calendar
/// date. Region, sales_rep and customer_id stay optional.
pub fn validate(raw: &RawRecord, source_file: &str) -> Result<ValidRecord, RejectReason> {
    let order_id = required(&raw.order_id, "order_id")?;
    let product = required(&raw.product, "product")?;
    let quantity_str = required(&raw.quantity, "quantity")?;
    let unit_price_str = required(&raw.unit_price, "unit_price")?;
    let order_date_str = required(&raw.order_date, "order_date")?;

    let quantity: i64 = quantity_str
        .parse()
        .ok()
        .filter(|q| *q >= 1)
        .ok_or(RejectReason::NotNumeric("quantity"))?;

    let unit_price: f64 = unit_price_str
        .parse()
        .ok()
        .filter(|p: &f64| p.is_finite() && *p >= 0.0)
        .ok_or(RejectReason::NotNumeric("unit_price"))?;

    let order_date = NaiveDate::parse_from_str(&order_date_str, DATE_FORMAT)
        .map_err(|_| RejectReason::InvalidDate)?;

    Ok(ValidRecord {
        order_id,
        product,
        quantity,
        unit_price,
        region: optional(&raw.region),
        sales_rep: optional(&raw.sales_rep),
        order_date,
        customer_id: optional(&raw.customer_id),
        source_file: source_file.to_string(),
    })
}

fn required(field: &Option<String>, name: &'static str) -> Result<String, RejectReason> {
    match field.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(RejectReason::MissingField(name)),
    }
}

fn optional(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
