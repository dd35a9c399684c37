//! JSON-lines event log, optionally LZ4-framed.

use super::{EventSource, SourceError};
use crate::domain::LedgerEvent;
use async_trait::async_trait;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Event log read fully into memory and served in file order.
#[derive(Debug, Clone, Default)]
pub struct JsonlEventSource {
    events: Vec<LedgerEvent>,
    rejected: usize,
}

impl JsonlEventSource {
    /// Read and decode the log at `path`. A `.lz4` suffix selects frame decompression.
    ///
    /// Lines that fail to decode are logged and skipped.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path).await?;
        let bytes = if path.extension().map_or(false, |ext| ext == "lz4") {
            Self::decompress_lz4_frame(&raw)?
        } else {
            raw
        };

        let source = Self::from_bytes(&bytes)?;
        info!(
            path = %path.display(),
            events = source.events.len(),
            rejected = source.rejected,
            "event log loaded"
        );
        Ok(source)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SourceError> {
        let (events, errors) = Self::parse_lines(bytes)?;
        for err in &errors {
            warn!(error = %err, "skipping undecodable event");
        }
        Ok(Self {
            events,
            rejected: errors.len(),
        })
    }

    pub fn decompress_lz4_frame(lz4_bytes: &[u8]) -> Result<Vec<u8>, SourceError> {
        let mut decoder = lz4_flex::frame::FrameDecoder::new(lz4_bytes);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| SourceError::Lz4(e.to_string()))?;
        Ok(out)
    }

    /// Decode one event per non-blank line (1-based line numbers in errors).
    pub fn parse_lines(bytes: &[u8]) -> Result<(Vec<LedgerEvent>, Vec<SourceError>), SourceError> {
        let text = std::str::from_utf8(bytes).map_err(|e| SourceError::Decode {
            line: 0,
            message: e.to_string(),
        })?;

        let mut events = Vec::new();
        let mut errors = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<LedgerEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => errors.push(SourceError::Decode {
                    line: idx + 1,
                    message: e.to_string(),
                }),
            }
        }
        Ok((events, errors))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[async_trait]
impl EventSource for JsonlEventSource {
    async fn fetch_events(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<LedgerEvent>, SourceError> {
        Ok(self.events.iter().skip(offset).take(limit).cloned().collect())
    }

    fn rejected(&self) -> usize {
        self.rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LOG: &str = concat!(
        r#"{"txHash":"0x1","logIndex":0,"blockNumber":1,"timestamp":1000,"type":"deposit","account":"alice","asset":"usdc","amount":"10"}"#,
        "\n\n",
        r#"{"txHash":"0x2","logIndex":0,"blockNumber":2,"timestamp":2000,"type":"deposit","asset":"usdc","amount":"10"}"#,
        "\n",
        r#"{"txHash":"0x3","logIndex":1,"blockNumber":3,"timestamp":3000,"type":"withdraw","account":"alice","asset":"usdc","amount":"4"}"#,
        "\n",
    );

    fn compress_lz4_frame(input: &[u8]) -> Vec<u8> {
        let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
        encoder.write_all(input).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_parse_skips_blank_and_reports_bad_lines() {
        let (events, errors) = JsonlEventSource::parse_lines(LOG.as_bytes()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], SourceError::Decode { line: 3, .. }));
    }

    #[tokio::test]
    async fn test_fetch_in_batches() {
        let source = JsonlEventSource::from_bytes(LOG.as_bytes()).unwrap();
        assert_eq!(source.rejected(), 1);
        let first = source.fetch_events(0, 1).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].block_number, 1);
        let rest = source.fetch_events(1, 10).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].block_number, 3);
        assert!(source.fetch_events(2, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_lz4_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl.lz4");
        std::fs::write(&path, compress_lz4_frame(LOG.as_bytes())).unwrap();

        let source = JsonlEventSource::open(&path).await.unwrap();
        assert_eq!(source.len(), 2);
    }

    #[tokio::test]
    async fn test_open_missing_file_is_io_error() {
        let err = JsonlEventSource::open("/nonexistent/events.jsonl").await.unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }
}
