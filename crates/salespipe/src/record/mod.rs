pub mod schema;
pub mod transform;
pub mod validate;

pub use schema::{ProcessingPath, RawRecord, SalesRecord, ValidRecord};
pub use transform::transform;
pub use validate::{validate, RejectReason};
