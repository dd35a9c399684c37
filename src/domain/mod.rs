//! Domain types for the lending ledger.
//!
//! This module provides:
//! - Lossless numeric handling: `Decimal` for USD/rates, `Amount` for raw token units
//! - Domain primitives: TimeMs, AccountId, AssetId, PositionSide
//! - The typed inbound event set and its ordering key
//! - Ledger entities: tokens, markets, accounts, positions, rates, snapshots, records

pub mod account;
pub mod amount;
pub mod decimal;
pub mod event;
pub mod market;
pub mod ordering;
pub mod position;
pub mod primitives;
pub mod protocol;
pub mod rate;
pub mod record;
pub mod snapshot;
pub mod token;

pub use account::Account;
pub use amount::{Amount, AmountParseError};
pub use decimal::Decimal;
pub use event::{
    AssetAmount, AssetConfig, AssetConfigChange, EventKind, EventValidationError, FarmReward,
    ForceClose, LedgerEvent, Liquidation, PriceUpdate, Transfer,
};
pub use market::{Market, RewardEmission};
pub use ordering::EventOrderingKey;
pub use position::{Position, PositionCounter, PositionKey, PositionSnapshot};
pub use primitives::{AccountId, AssetId, PositionSide, TimeMs, MS_PER_DAY, MS_PER_HOUR};
pub use protocol::Protocol;
pub use rate::{InterestRate, RateType};
pub use record::{LiquidationRecord, TransactionKind, TransactionRecord};
pub use snapshot::{FinancialSnapshot, MarketSnapshot, SnapshotPeriod, UsageSnapshot};
pub use token::Token;
