pub mod batch;
pub mod report;
pub mod stream;

pub use batch::BatchPipeline;
pub use report::{BatchReport, RejectCounts, StreamReport};
pub use stream::StreamPipeline;
