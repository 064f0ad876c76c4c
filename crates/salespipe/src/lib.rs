pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod record;
pub mod scheduler;
pub mod storage;
pub mod worker;

pub use config::{load_config, Config};
pub use error::{ConfigError, ExtractError, Result, SalespipeError, StorageError, WorkerError};
pub use pipeline::{BatchPipeline, BatchReport, StreamPipeline, StreamReport};
pub use record::{ProcessingPath, RawRecord, RejectReason, SalesRecord, ValidRecord};
pub use scheduler::Scheduler;
