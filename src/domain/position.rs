//! Position lifecycle entities.
//!
//! A position is identified by `(account, market, side, counter)`. The
//! [`PositionCounter`] for `(account, market, side)` holds the counter of the
//! position currently accepting mutations; closing bumps it so the next
//! deposit or borrow mints a fresh id.

use crate::domain::{AccountId, Amount, AssetId, Decimal, PositionSide, TimeMs};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionKey {
    pub account: AccountId,
    pub market: AssetId,
    pub side: PositionSide,
}

impl PositionKey {
    pub fn new(account: AccountId, market: AssetId, side: PositionSide) -> Self {
        PositionKey {
            account,
            market,
            side,
        }
    }

    /// `{account}-{market}-{SIDE}`.
    pub fn counter_id(&self) -> String {
        format!("{}-{}-{}", self.account, self.market, self.side)
    }

    /// `{account}-{market}-{SIDE}-{count}`.
    pub fn position_id(&self, count: u64) -> String {
        format!("{}-{}", self.counter_id(), count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionCounter {
    pub id: String,
    pub next_count: u64,
    pub last_timestamp: TimeMs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    pub account: AccountId,
    pub market: AssetId,
    pub side: PositionSide,
    pub counter: u64,
    pub balance: Amount,

    pub hash_opened: String,
    pub block_number_opened: u64,
    pub timestamp_opened: TimeMs,
    pub hash_closed: Option<String>,
    pub block_number_closed: Option<u64>,
    pub timestamp_closed: Option<TimeMs>,

    pub deposit_count: u64,
    pub withdraw_count: u64,
    pub borrow_count: u64,
    pub repay_count: u64,
    pub liquidation_count: u64,
}

impl Position {
    pub fn open(key: &PositionKey, counter: u64, hash: &str, block_number: u64, timestamp: TimeMs) -> Self {
        Position {
            id: key.position_id(counter),
            account: key.account.clone(),
            market: key.market.clone(),
            side: key.side,
            counter,
            balance: Amount::zero(),
            hash_opened: hash.to_string(),
            block_number_opened: block_number,
            timestamp_opened: timestamp,
            hash_closed: None,
            block_number_closed: None,
            timestamp_closed: None,
            deposit_count: 0,
            withdraw_count: 0,
            borrow_count: 0,
            repay_count: 0,
            liquidation_count: 0,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.timestamp_closed.is_some()
    }
}

/// Balance of a position right after one event touched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSnapshot {
    pub id: String,
    pub position: String,
    pub hash: String,
    pub log_index: u64,
    pub balance: Amount,
    #[serde(rename = "balanceUSD")]
    pub balance_usd: Decimal,
    pub block_number: u64,
    pub timestamp: TimeMs,
}
