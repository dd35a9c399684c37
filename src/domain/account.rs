use crate::domain::{AccountId, TimeMs};
use serde::{Deserialize, Serialize};

/// Per-user activity counters. Created on first reference, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub position_count: u64,
    pub open_position_count: u64,
    pub closed_position_count: u64,
    pub deposit_count: u64,
    pub withdraw_count: u64,
    pub borrow_count: u64,
    pub repay_count: u64,
    /// Liquidations this account performed.
    pub liquidate_count: u64,
    /// Liquidations this account suffered.
    pub liquidation_count: u64,
    pub created_timestamp: TimeMs,
    pub created_block_number: u64,
    pub last_active_timestamp: TimeMs,
}

impl Account {
    pub fn new(id: AccountId, timestamp: TimeMs, block_number: u64) -> Self {
        Account {
            id,
            position_count: 0,
            open_position_count: 0,
            closed_position_count: 0,
            deposit_count: 0,
            withdraw_count: 0,
            borrow_count: 0,
            repay_count: 0,
            liquidate_count: 0,
            liquidation_count: 0,
            created_timestamp: timestamp,
            created_block_number: block_number,
            last_active_timestamp: timestamp,
        }
    }

    pub fn touch(&mut self, timestamp: TimeMs) {
        if timestamp > self.last_active_timestamp {
            self.last_active_timestamp = timestamp;
        }
    }
}
