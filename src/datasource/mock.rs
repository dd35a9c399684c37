//! In-memory event source for tests.

use super::{EventSource, SourceError};
use crate::domain::LedgerEvent;
use async_trait::async_trait;

/// Serves a fixed list of events in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MockEventSource {
    events: Vec<LedgerEvent>,
}

impl MockEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event(mut self, event: LedgerEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_events(mut self, events: Vec<LedgerEvent>) -> Self {
        self.events.extend(events);
        self
    }
}

#[async_trait]
impl EventSource for MockEventSource {
    async fn fetch_events(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<LedgerEvent>, SourceError> {
        Ok(self.events.iter().skip(offset).take(limit).cloned().collect())
    }
}
