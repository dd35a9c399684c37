//! Inbound ledger events.
//!
//! Every event carries its chain coordinates (`txHash`, `logIndex`, `blockNumber`,
//! `timestamp`) next to a `type`-tagged payload. Payloads are validated once at the
//! boundary by [`LedgerEvent::validate`]; the engine assumes well-formed input.

use crate::domain::{AccountId, Amount, AssetId, Decimal, TimeMs};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single finalized event from the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEvent {
    /// Transaction (receipt) hash when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Position of the event inside its transaction.
    #[serde(default)]
    pub log_index: u64,
    pub block_number: u64,
    pub timestamp: TimeMs,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventKind {
    AssetRegistered(AssetConfigChange),
    AssetUpdated(AssetConfigChange),
    PriceUpdated(PriceUpdate),
    FarmRewardAdded(FarmReward),
    Deposit(Transfer),
    Withdraw(Transfer),
    Borrow(Transfer),
    Repay(Transfer),
    Liquidate(Liquidation),
    ForceClose(ForceClose),
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::AssetRegistered(_) => "assetRegistered",
            EventKind::AssetUpdated(_) => "assetUpdated",
            EventKind::PriceUpdated(_) => "priceUpdated",
            EventKind::FarmRewardAdded(_) => "farmRewardAdded",
            EventKind::Deposit(_) => "deposit",
            EventKind::Withdraw(_) => "withdraw",
            EventKind::Borrow(_) => "borrow",
            EventKind::Repay(_) => "repay",
            EventKind::Liquidate(_) => "liquidate",
            EventKind::ForceClose(_) => "forceClose",
        }
    }
}

/// Per-asset lending configuration.
///
/// Utilization figures are basis points; the two utilization rates are per-millisecond
/// growth factors with 27 decimals (`10^27` is a factor of exactly 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetConfig {
    pub reserve_ratio: u32,
    pub target_utilization: u32,
    pub target_utilization_rate: Amount,
    pub max_utilization_rate: Amount,
    #[serde(default)]
    pub volatility_ratio: u32,
    #[serde(default)]
    pub extra_decimals: u32,
    #[serde(default = "default_true")]
    pub can_deposit: bool,
    #[serde(default = "default_true")]
    pub can_withdraw: bool,
    #[serde(default = "default_true")]
    pub can_use_as_collateral: bool,
    #[serde(default = "default_true")]
    pub can_borrow: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetConfigChange {
    pub asset: AssetId,
    pub config: AssetConfig,
}

/// Oracle price: one whole token is worth `price / 10^decimals` USD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdate {
    pub asset: AssetId,
    pub price: Amount,
    pub decimals: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmReward {
    pub asset: AssetId,
    pub reward_token: AssetId,
    pub reward_per_day: Amount,
    pub new_reward_amount: Amount,
}

/// Deposit, withdraw, borrow and repay all share this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub account: AccountId,
    pub asset: AssetId,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetAmount {
    pub asset: AssetId,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Liquidation {
    pub liquidator: AccountId,
    pub liquidatee: AccountId,
    /// Repaid debt, in the order the protocol settled it.
    pub debts: Vec<AssetAmount>,
    /// Seized collateral, in the order the protocol released it.
    pub collaterals: Vec<AssetAmount>,
    #[serde(rename = "repaidUSD")]
    pub repaid_usd: Decimal,
    #[serde(rename = "collateralUSD")]
    pub collateral_usd: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceClose {
    pub liquidatee: AccountId,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventValidationError {
    #[error("{0} event has a zero amount")]
    ZeroAmount(&'static str),
    #[error("{0} event has an empty identifier")]
    EmptyId(&'static str),
    #[error("liquidation lists no repaid debt")]
    NoDebts,
    #[error("liquidation lists no seized collateral")]
    NoCollateral,
    #[error("liquidation USD totals must be positive (repaid={repaid}, collateral={collateral})")]
    NonPositiveUsd { repaid: Decimal, collateral: Decimal },
}

impl LedgerEvent {
    /// Natural id of the event: `{txHash}-{logIndex}`.
    ///
    /// Without a transaction hash, falls back to a truncated SHA-256 over the
    /// canonical JSON encoding of the event so redelivery maps to the same key.
    pub fn event_key(&self) -> String {
        if let Some(tx) = self.tx_hash.as_deref().filter(|s| !s.trim().is_empty()) {
            return format!("{}-{}", tx.trim().to_lowercase(), self.log_index);
        }

        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.block_number.to_le_bytes());
        hasher.update(self.log_index.to_le_bytes());
        hasher.update(self.timestamp.as_ms().to_le_bytes());
        hasher.update(serde_json::to_vec(&self.kind).unwrap_or_default());
        let hash = hasher.finalize();
        format!("hash:{}", hex::encode(&hash[..16]))
    }

    /// Transaction hash used on derived rows; the event key stands in when absent.
    pub fn hash_or_key(&self) -> String {
        match self.tx_hash.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(tx) => tx.trim().to_lowercase(),
            None => self.event_key(),
        }
    }

    /// Reject payloads the engine must never see.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        let name = self.kind.name();
        match &self.kind {
            EventKind::AssetRegistered(c) | EventKind::AssetUpdated(c) => {
                non_empty(name, c.asset.as_str())
            }
            EventKind::PriceUpdated(p) => non_empty(name, p.asset.as_str()),
            EventKind::FarmRewardAdded(r) => {
                non_empty(name, r.asset.as_str())?;
                non_empty(name, r.reward_token.as_str())
            }
            EventKind::Deposit(t)
            | EventKind::Withdraw(t)
            | EventKind::Borrow(t)
            | EventKind::Repay(t) => {
                non_empty(name, t.account.as_str())?;
                non_empty(name, t.asset.as_str())?;
                if t.amount.is_zero() {
                    return Err(EventValidationError::ZeroAmount(name));
                }
                Ok(())
            }
            EventKind::Liquidate(l) => {
                non_empty(name, l.liquidator.as_str())?;
                non_empty(name, l.liquidatee.as_str())?;
                if l.debts.is_empty() {
                    return Err(EventValidationError::NoDebts);
                }
                if l.collaterals.is_empty() {
                    return Err(EventValidationError::NoCollateral);
                }
                if !l.repaid_usd.is_positive() || !l.collateral_usd.is_positive() {
                    return Err(EventValidationError::NonPositiveUsd {
                        repaid: l.repaid_usd,
                        collateral: l.collateral_usd,
                    });
                }
                for entry in l.debts.iter().chain(l.collaterals.iter()) {
                    non_empty(name, entry.asset.as_str())?;
                    if entry.amount.is_zero() {
                        return Err(EventValidationError::ZeroAmount(name));
                    }
                }
                Ok(())
            }
            EventKind::ForceClose(f) => non_empty(name, f.liquidatee.as_str()),
        }
    }
}

fn non_empty(name: &'static str, id: &str) -> Result<(), EventValidationError> {
    if id.trim().is_empty() {
        Err(EventValidationError::EmptyId(name))
    } else {
        Ok(())
    }
}
