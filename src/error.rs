use crate::config::ConfigError;
use crate::datasource::SourceError;
use crate::orchestration::IngestionError;
use thiserror::Error;

/// Failure that aborts a single event.
///
/// Mutations saved before the failure are kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("{entity} {id} not found")]
    MissingReference { entity: &'static str, id: String },
    #[error("invalid event: {0}")]
    InvalidEvent(String),
}

impl EngineError {
    pub fn missing(entity: &'static str, id: impl Into<String>) -> Self {
        EngineError::MissingReference {
            entity,
            id: id.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Event source error: {0}")]
    Source(#[from] SourceError),
    #[error("Ingestion error: {0}")]
    Ingestion(#[from] IngestionError),
    #[error("Output error: {0}")]
    Output(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Output(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Output(err.to_string())
    }
}
