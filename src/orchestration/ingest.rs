use crate::datasource::{EventSource, SourceError};
use crate::domain::EventOrderingKey;
use crate::engine::{LedgerEngine, Outcome};
use crate::store::Store;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Drives the engine from an event feed, one batch at a time.
#[derive(Clone)]
pub struct Ingestor {
    source: Arc<dyn EventSource>,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(source: Arc<dyn EventSource>, batch_size: usize) -> Self {
        Self {
            source,
            batch_size: batch_size.max(1),
        }
    }

    /// Replay the whole feed through `engine`.
    ///
    /// Events are applied in feed order. Ordering regressions are logged and
    /// counted but never reordered; events failing validation are skipped.
    pub async fn run<S: Store>(
        &self,
        engine: &mut LedgerEngine<S>,
    ) -> Result<IngestionResult, IngestionError> {
        let mut result = IngestionResult::default();
        let mut last: Option<EventOrderingKey> = None;
        let mut offset = 0;

        loop {
            let batch = self.source.fetch_events(offset, self.batch_size).await?;
            if batch.is_empty() {
                break;
            }
            offset += batch.len();
            result.events_fetched += batch.len();

            for event in &batch {
                let key = EventOrderingKey::from_event(event);
                if let Some(prev) = last {
                    if EventOrderingKey::is_regression(&prev, &key) {
                        warn!(
                            prev_block = prev.block_number,
                            prev_log = prev.log_index,
                            block = key.block_number,
                            log = key.log_index,
                            "event arrived out of order"
                        );
                        result.out_of_order += 1;
                    }
                }
                last = Some(last.map_or(key, |p| p.max(key)));

                if let Err(err) = event.validate() {
                    warn!(event_key = %event.event_key(), error = %err, "event rejected");
                    result.rejected += 1;
                    continue;
                }

                match engine.process(event) {
                    Outcome::Applied => result.applied += 1,
                    Outcome::Duplicate => result.duplicates += 1,
                    Outcome::Aborted(_) => result.aborted += 1,
                }
            }

            info!(offset, applied = result.applied, "batch processed");
        }

        result.rejected += self.source.rejected();
        Ok(result)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionResult {
    pub events_fetched: usize,
    pub applied: usize,
    pub duplicates: usize,
    pub aborted: usize,
    /// Undecodable records plus events failing validation.
    pub rejected: usize,
    pub out_of_order: usize,
}

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error(transparent)]
    Source(#[from] SourceError),
}
