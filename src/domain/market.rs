//! A single asset's pooled lending book.

use crate::domain::{Amount, AssetConfig, AssetId, Decimal, SnapshotPeriod, TimeMs};
use serde::{Deserialize, Serialize};

/// Remaining farm rewards distributed to one side of a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardEmission {
    pub reward_token: AssetId,
    pub remaining: Amount,
    pub amount_per_day: Amount,
    #[serde(rename = "usdPerDay")]
    pub usd_per_day: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub id: AssetId,
    pub name: String,
    pub input_token: AssetId,

    pub is_active: bool,
    pub can_withdraw: bool,
    pub can_borrow_from: bool,
    pub can_use_as_collateral: bool,
    /// Percent.
    pub maximum_ltv: Decimal,
    /// Percent.
    pub liquidation_threshold: Decimal,

    // Pooled balances, raw units.
    pub input_token_balance: Amount,
    pub output_token_supply: Amount,
    pub total_borrowed: Amount,
    pub total_reserved: Amount,

    // Rate curve.
    /// Basis points of interest retained as reserve.
    pub reserve_ratio: u32,
    /// Kink of the rate curve, basis points of utilization.
    pub target_utilization: u32,
    /// Per-ms growth factor at the kink, 27 decimals.
    pub target_utilization_rate: Amount,
    /// Per-ms growth factor at full utilization, 27 decimals.
    pub max_utilization_rate: Amount,

    // Valuation, refreshed after every event touching the market.
    #[serde(rename = "inputTokenPriceUSD")]
    pub input_token_price_usd: Decimal,
    #[serde(rename = "outputTokenPriceUSD")]
    pub output_token_price_usd: Decimal,
    pub exchange_rate: Decimal,
    #[serde(rename = "totalValueLockedUSD")]
    pub total_value_locked_usd: Decimal,
    #[serde(rename = "totalDepositBalanceUSD")]
    pub total_deposit_balance_usd: Decimal,
    #[serde(rename = "totalBorrowBalanceUSD")]
    pub total_borrow_balance_usd: Decimal,

    // Cumulative counters.
    #[serde(rename = "cumulativeSupplySideRevenueUSD")]
    pub cumulative_supply_side_revenue_usd: Decimal,
    #[serde(rename = "cumulativeProtocolSideRevenueUSD")]
    pub cumulative_protocol_side_revenue_usd: Decimal,
    #[serde(rename = "cumulativeTotalRevenueUSD")]
    pub cumulative_total_revenue_usd: Decimal,
    #[serde(rename = "cumulativeDepositUSD")]
    pub cumulative_deposit_usd: Decimal,
    #[serde(rename = "cumulativeBorrowUSD")]
    pub cumulative_borrow_usd: Decimal,
    #[serde(rename = "cumulativeLiquidateUSD")]
    pub cumulative_liquidate_usd: Decimal,

    pub open_position_count: u64,
    pub closed_position_count: u64,
    pub lending_position_count: u64,
    pub borrowing_position_count: u64,

    pub rewards: Vec<RewardEmission>,

    pub created_timestamp: TimeMs,
    pub created_block_number: u64,
    /// Interest clock; advanced only by the compounding step.
    pub last_update_timestamp: TimeMs,

    /// Last daily bucket a snapshot was opened for.
    pub last_daily_bucket: Option<i64>,
    /// Last hourly bucket a snapshot was opened for.
    pub last_hourly_bucket: Option<i64>,
}

impl Market {
    pub fn new(id: AssetId, name: String, timestamp: TimeMs, block_number: u64) -> Self {
        Market {
            input_token: id.clone(),
            id,
            name,
            is_active: true,
            can_withdraw: true,
            can_borrow_from: true,
            can_use_as_collateral: true,
            maximum_ltv: Decimal::zero(),
            liquidation_threshold: Decimal::zero(),
            input_token_balance: Amount::zero(),
            output_token_supply: Amount::zero(),
            total_borrowed: Amount::zero(),
            total_reserved: Amount::zero(),
            reserve_ratio: 0,
            target_utilization: 0,
            target_utilization_rate: Amount::zero(),
            max_utilization_rate: Amount::zero(),
            input_token_price_usd: Decimal::zero(),
            output_token_price_usd: Decimal::zero(),
            exchange_rate: Decimal::one(),
            total_value_locked_usd: Decimal::zero(),
            total_deposit_balance_usd: Decimal::zero(),
            total_borrow_balance_usd: Decimal::zero(),
            cumulative_supply_side_revenue_usd: Decimal::zero(),
            cumulative_protocol_side_revenue_usd: Decimal::zero(),
            cumulative_total_revenue_usd: Decimal::zero(),
            cumulative_deposit_usd: Decimal::zero(),
            cumulative_borrow_usd: Decimal::zero(),
            cumulative_liquidate_usd: Decimal::zero(),
            open_position_count: 0,
            closed_position_count: 0,
            lending_position_count: 0,
            borrowing_position_count: 0,
            rewards: Vec::new(),
            created_timestamp: timestamp,
            created_block_number: block_number,
            last_update_timestamp: timestamp,
            last_daily_bucket: None,
            last_hourly_bucket: None,
        }
    }

    /// Apply an asset configuration (registration or update).
    pub fn apply_config(&mut self, config: &AssetConfig) {
        self.reserve_ratio = config.reserve_ratio;
        self.target_utilization = config.target_utilization;
        self.target_utilization_rate = config.target_utilization_rate;
        self.max_utilization_rate = config.max_utilization_rate;
        self.is_active = config.can_deposit;
        self.can_withdraw = config.can_withdraw;
        self.can_borrow_from = config.can_borrow;
        self.can_use_as_collateral = config.can_use_as_collateral;
        let ltv = Decimal::from(config.volatility_ratio as u64) / Decimal::hundred();
        self.maximum_ltv = ltv;
        self.liquidation_threshold = ltv;
    }

    pub fn last_bucket(&self, period: SnapshotPeriod) -> Option<i64> {
        match period {
            SnapshotPeriod::Daily => self.last_daily_bucket,
            SnapshotPeriod::Hourly => self.last_hourly_bucket,
        }
    }

    pub fn set_last_bucket(&mut self, period: SnapshotPeriod, bucket: i64) {
        match period {
            SnapshotPeriod::Daily => self.last_daily_bucket = Some(bucket),
            SnapshotPeriod::Hourly => self.last_hourly_bucket = Some(bucket),
        }
    }
}
