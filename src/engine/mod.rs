//! Synchronous accounting engine.
//!
//! One event at a time, in arrival order. Every handler loads the entities it
//! needs from the [`Store`], mutates copies and writes them back before the
//! next event is looked at.

use crate::config::ProtocolConfig;
use crate::datasource::{PriceSource, TokenMetadataSource};
use crate::domain::{LedgerEvent, TimeMs};
use crate::error::EngineError;
use crate::store::Store;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

pub mod accounts;
pub mod compound;
pub mod ledger;
pub mod liquidation;
pub mod position_tracker;
pub mod processor;
pub mod protocol;
pub mod rates;
pub mod snapshots;

pub use position_tracker::{PositionChange, PositionTracker, Transition};

/// Chain coordinates shared by every row an event produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMeta {
    /// Transaction hash, or the event key when the feed has none.
    pub hash: String,
    pub log_index: u64,
    pub block_number: u64,
    pub timestamp: TimeMs,
}

impl EventMeta {
    pub fn from_event(event: &LedgerEvent) -> Self {
        EventMeta {
            hash: event.hash_or_key(),
            log_index: event.log_index,
            block_number: event.block_number,
            timestamp: event.timestamp,
        }
    }

    /// `{hash}-{logIndex}`.
    pub fn record_id(&self) -> String {
        format!("{}-{}", self.hash, self.log_index)
    }
}

/// Kind of balance movement; selects which counters a change bumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Deposit,
    Withdraw,
    Borrow,
    Repay,
    /// The account was liquidated.
    Liquidation,
    /// Balance moved on the account's behalf; no activity counter.
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub applied: u64,
    pub duplicates: u64,
    pub aborted: u64,
    pub numeric_guards: u64,
    pub integrity_warnings: u64,
    pub price_unavailable: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Event key already in the processed ledger; nothing was touched.
    Duplicate,
    /// Handler failed part way; earlier saves stand.
    Aborted(EngineError),
}

pub struct LedgerEngine<S: Store> {
    store: S,
    config: ProtocolConfig,
    prices: Arc<dyn PriceSource>,
    tokens: Arc<dyn TokenMetadataSource>,
    stats: EngineStats,
}

impl<S: Store> LedgerEngine<S> {
    pub fn new(
        store: S,
        config: ProtocolConfig,
        prices: Arc<dyn PriceSource>,
        tokens: Arc<dyn TokenMetadataSource>,
    ) -> Self {
        Self {
            store,
            config,
            prices,
            tokens,
            stats: EngineStats::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Apply one event.
    ///
    /// The event key enters the processed ledger before any mutation, so a
    /// redelivered event is skipped even if its first delivery aborted.
    pub fn process(&mut self, event: &LedgerEvent) -> Outcome {
        let key = event.event_key();
        if self.store.is_processed(&key) {
            debug!(event_key = %key, "duplicate event skipped");
            self.stats.duplicates += 1;
            return Outcome::Duplicate;
        }
        self.store.mark_processed(key.clone());

        match self.apply(event) {
            Ok(()) => {
                self.stats.applied += 1;
                Outcome::Applied
            }
            Err(err) => {
                warn!(event_key = %key, kind = event.kind.name(), error = %err, "event aborted");
                self.stats.aborted += 1;
                Outcome::Aborted(err)
            }
        }
    }
}
