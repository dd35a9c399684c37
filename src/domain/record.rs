//! Immutable per-event record rows.

use crate::domain::{AccountId, Amount, AssetId, Decimal, TimeMs};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    Borrow,
    Repay,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdraw => "withdraw",
            TransactionKind::Borrow => "borrow",
            TransactionKind::Repay => "repay",
        }
    }
}

/// One deposit, withdraw, borrow or repay. Id: `{txHash}-{logIndex}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    pub kind: TransactionKind,
    pub hash: String,
    pub log_index: u64,
    pub account: AccountId,
    pub market: AssetId,
    pub asset: AssetId,
    pub amount: Amount,
    #[serde(rename = "amountUSD")]
    pub amount_usd: Decimal,
    pub position: String,
    pub block_number: u64,
    pub timestamp: TimeMs,
}

/// One collateral transfer of a liquidation. Id: `{txHash}-{logIndex}-{n}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationRecord {
    pub id: String,
    pub hash: String,
    pub log_index: u64,
    pub liquidator: AccountId,
    pub liquidatee: AccountId,
    pub market: AssetId,
    pub asset: AssetId,
    pub amount: Amount,
    #[serde(rename = "amountUSD")]
    pub amount_usd: Decimal,
    #[serde(rename = "profitUSD")]
    pub profit_usd: Decimal,
    /// Liquidatee position the collateral was taken from.
    pub position: String,
    pub block_number: u64,
    pub timestamp: TimeMs,
}
