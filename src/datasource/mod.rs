//! Event feed and pricing collaborators.

use crate::domain::LedgerEvent;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod jsonl;
pub mod mock;
pub mod oracle;

pub use jsonl::JsonlEventSource;
pub use mock::MockEventSource;
pub use oracle::{PriceQuote, PriceSource, StaticOracle, TokenMetadata, TokenMetadataSource};

/// Ordered, replayable feed of finalized ledger events.
#[async_trait]
pub trait EventSource: Send + Sync + fmt::Debug {
    /// Fetch up to `limit` events starting at position `offset`.
    ///
    /// # Returns
    /// Events in feed order; an empty vector once the feed is exhausted.
    async fn fetch_events(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<LedgerEvent>, SourceError>;

    /// Records the source dropped because they could not be decoded.
    fn rejected(&self) -> usize {
        0
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("io error: {0}")]
    Io(String),
    #[error("decode error at line {line}: {message}")]
    Decode { line: usize, message: String },
    #[error("lz4 decode error: {0}")]
    Lz4(String),
    #[error("csv parse error: {0}")]
    Csv(String),
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        SourceError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_display() {
        let err = SourceError::Decode {
            line: 7,
            message: "missing field `asset`".to_string(),
        };
        assert_eq!(err.to_string(), "decode error at line 7: missing field `asset`");

        let err = SourceError::Lz4("bad frame".to_string());
        assert_eq!(err.to_string(), "lz4 decode error: bad frame");
    }
}
