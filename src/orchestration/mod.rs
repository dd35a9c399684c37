pub mod ingest;
pub mod replay;

pub use ingest::{IngestionError, IngestionResult, Ingestor};
pub use replay::{replay, ReplayReport};
