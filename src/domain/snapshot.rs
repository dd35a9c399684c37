//! Time-bucketed rollups of market and protocol state.
//!
//! A snapshot row is opened lazily by the first event inside its bucket and is
//! seeded from the owning entity's cumulative fields. Period fields then
//! accumulate deltas until the bucket rolls over.

use crate::domain::{Amount, AssetId, Decimal, Market, Protocol, TimeMs};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotPeriod {
    Daily,
    Hourly,
}

impl SnapshotPeriod {
    pub const ALL: [SnapshotPeriod; 2] = [SnapshotPeriod::Daily, SnapshotPeriod::Hourly];

    pub fn bucket(&self, timestamp: TimeMs) -> i64 {
        match self {
            SnapshotPeriod::Daily => timestamp.day_id(),
            SnapshotPeriod::Hourly => timestamp.hour_id(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotPeriod::Daily => "daily",
            SnapshotPeriod::Hourly => "hourly",
        }
    }
}

/// Per-bucket market rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    /// `{market}-{bucket}`.
    pub id: String,
    pub period: SnapshotPeriod,
    pub bucket: i64,
    pub market: AssetId,
    pub protocol: String,
    /// Ids of the frozen interest-rate copies for this bucket.
    pub rates: Vec<String>,

    pub input_token_balance: Amount,
    pub output_token_supply: Amount,
    pub total_borrowed: Amount,
    pub total_reserved: Amount,
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
    pub reward_token_emissions_amount: Vec<Amount>,
    #[serde(rename = "rewardTokenEmissionsUSD")]
    pub reward_token_emissions_usd: Vec<Decimal>,

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

    #[serde(rename = "supplySideRevenueUSD")]
    pub supply_side_revenue_usd: Decimal,
    #[serde(rename = "protocolSideRevenueUSD")]
    pub protocol_side_revenue_usd: Decimal,
    #[serde(rename = "totalRevenueUSD")]
    pub total_revenue_usd: Decimal,
    #[serde(rename = "depositUSD")]
    pub deposit_usd: Decimal,
    #[serde(rename = "withdrawUSD")]
    pub withdraw_usd: Decimal,
    #[serde(rename = "borrowUSD")]
    pub borrow_usd: Decimal,
    #[serde(rename = "repayUSD")]
    pub repay_usd: Decimal,
    #[serde(rename = "liquidateUSD")]
    pub liquidate_usd: Decimal,

    pub deposit_count: u64,
    pub withdraw_count: u64,
    pub borrow_count: u64,
    pub repay_count: u64,
    pub liquidate_count: u64,

    pub block_number: u64,
    pub timestamp: TimeMs,
}

impl MarketSnapshot {
    pub fn id_for(market: &AssetId, bucket: i64) -> String {
        format!("{}-{}", market, bucket)
    }

    pub fn open(
        period: SnapshotPeriod,
        bucket: i64,
        market: &Market,
        protocol: &str,
        block_number: u64,
        timestamp: TimeMs,
    ) -> Self {
        let mut snapshot = MarketSnapshot {
            id: MarketSnapshot::id_for(&market.id, bucket),
            period,
            bucket,
            market: market.id.clone(),
            protocol: protocol.to_string(),
            rates: Vec::new(),
            input_token_balance: Amount::zero(),
            output_token_supply: Amount::zero(),
            total_borrowed: Amount::zero(),
            total_reserved: Amount::zero(),
            input_token_price_usd: Decimal::zero(),
            output_token_price_usd: Decimal::zero(),
            exchange_rate: Decimal::one(),
            total_value_locked_usd: Decimal::zero(),
            total_deposit_balance_usd: Decimal::zero(),
            total_borrow_balance_usd: Decimal::zero(),
            reward_token_emissions_amount: Vec::new(),
            reward_token_emissions_usd: Vec::new(),
            cumulative_supply_side_revenue_usd: Decimal::zero(),
            cumulative_protocol_side_revenue_usd: Decimal::zero(),
            cumulative_total_revenue_usd: Decimal::zero(),
            cumulative_deposit_usd: Decimal::zero(),
            cumulative_borrow_usd: Decimal::zero(),
            cumulative_liquidate_usd: Decimal::zero(),
            supply_side_revenue_usd: Decimal::zero(),
            protocol_side_revenue_usd: Decimal::zero(),
            total_revenue_usd: Decimal::zero(),
            deposit_usd: Decimal::zero(),
            withdraw_usd: Decimal::zero(),
            borrow_usd: Decimal::zero(),
            repay_usd: Decimal::zero(),
            liquidate_usd: Decimal::zero(),
            deposit_count: 0,
            withdraw_count: 0,
            borrow_count: 0,
            repay_count: 0,
            liquidate_count: 0,
            block_number,
            timestamp,
        };
        snapshot.carry_cumulative(market);
        snapshot.copy_state(market, block_number, timestamp);
        snapshot
    }

    /// Overwrite the cumulative counters with the market's current totals.
    pub fn carry_cumulative(&mut self, market: &Market) {
        self.cumulative_supply_side_revenue_usd = market.cumulative_supply_side_revenue_usd;
        self.cumulative_protocol_side_revenue_usd = market.cumulative_protocol_side_revenue_usd;
        self.cumulative_total_revenue_usd = market.cumulative_total_revenue_usd;
        self.cumulative_deposit_usd = market.cumulative_deposit_usd;
        self.cumulative_borrow_usd = market.cumulative_borrow_usd;
        self.cumulative_liquidate_usd = market.cumulative_liquidate_usd;
    }

    /// Copy balances and valuation from the market.
    pub fn copy_state(&mut self, market: &Market, block_number: u64, timestamp: TimeMs) {
        self.input_token_balance = market.input_token_balance;
        self.output_token_supply = market.output_token_supply;
        self.total_borrowed = market.total_borrowed;
        self.total_reserved = market.total_reserved;
        self.input_token_price_usd = market.input_token_price_usd;
        self.output_token_price_usd = market.output_token_price_usd;
        self.exchange_rate = market.exchange_rate;
        self.total_value_locked_usd = market.total_value_locked_usd;
        self.total_deposit_balance_usd = market.total_deposit_balance_usd;
        self.total_borrow_balance_usd = market.total_borrow_balance_usd;
        self.reward_token_emissions_amount =
            market.rewards.iter().map(|r| r.amount_per_day).collect();
        self.reward_token_emissions_usd = market.rewards.iter().map(|r| r.usd_per_day).collect();
        self.block_number = block_number;
        self.timestamp = timestamp;
    }
}

/// Protocol-wide activity for one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    /// `{bucket}`.
    pub id: String,
    pub period: SnapshotPeriod,
    pub bucket: i64,
    pub protocol: String,

    pub active_users: u64,
    pub cumulative_unique_users: u64,
    pub cumulative_unique_depositors: u64,
    pub cumulative_unique_borrowers: u64,
    pub cumulative_unique_liquidators: u64,
    pub cumulative_unique_liquidatees: u64,

    pub transaction_count: u64,
    pub deposit_count: u64,
    pub withdraw_count: u64,
    pub borrow_count: u64,
    pub repay_count: u64,
    pub liquidate_count: u64,

    pub open_position_count: u64,
    pub cumulative_position_count: u64,
    pub total_pool_count: u64,

    pub block_number: u64,
    pub timestamp: TimeMs,
}

impl UsageSnapshot {
    pub fn open(period: SnapshotPeriod, bucket: i64, protocol: &Protocol) -> Self {
        let mut snapshot = UsageSnapshot {
            id: bucket.to_string(),
            period,
            bucket,
            protocol: protocol.id.clone(),
            active_users: 0,
            cumulative_unique_users: 0,
            cumulative_unique_depositors: 0,
            cumulative_unique_borrowers: 0,
            cumulative_unique_liquidators: 0,
            cumulative_unique_liquidatees: 0,
            transaction_count: 0,
            deposit_count: 0,
            withdraw_count: 0,
            borrow_count: 0,
            repay_count: 0,
            liquidate_count: 0,
            open_position_count: 0,
            cumulative_position_count: 0,
            total_pool_count: 0,
            block_number: 0,
            timestamp: TimeMs::default(),
        };
        snapshot.carry_cumulative(protocol);
        snapshot
    }

    pub fn carry_cumulative(&mut self, protocol: &Protocol) {
        self.cumulative_unique_users = protocol.cumulative_unique_users;
        self.cumulative_unique_depositors = protocol.cumulative_unique_depositors;
        self.cumulative_unique_borrowers = protocol.cumulative_unique_borrowers;
        self.cumulative_unique_liquidators = protocol.cumulative_unique_liquidators;
        self.cumulative_unique_liquidatees = protocol.cumulative_unique_liquidatees;
        self.open_position_count = protocol.open_position_count;
        self.cumulative_position_count = protocol.cumulative_position_count;
        self.total_pool_count = protocol.total_pool_count;
    }
}

/// Protocol-wide daily financials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSnapshot {
    /// `{day}`.
    pub id: String,
    pub bucket: i64,
    pub protocol: String,

    #[serde(rename = "totalValueLockedUSD")]
    pub total_value_locked_usd: Decimal,
    #[serde(rename = "totalDepositBalanceUSD")]
    pub total_deposit_balance_usd: Decimal,
    #[serde(rename = "totalBorrowBalanceUSD")]
    pub total_borrow_balance_usd: Decimal,

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

    #[serde(rename = "dailySupplySideRevenueUSD")]
    pub daily_supply_side_revenue_usd: Decimal,
    #[serde(rename = "dailyProtocolSideRevenueUSD")]
    pub daily_protocol_side_revenue_usd: Decimal,
    #[serde(rename = "dailyTotalRevenueUSD")]
    pub daily_total_revenue_usd: Decimal,
    #[serde(rename = "dailyDepositUSD")]
    pub daily_deposit_usd: Decimal,
    #[serde(rename = "dailyWithdrawUSD")]
    pub daily_withdraw_usd: Decimal,
    #[serde(rename = "dailyBorrowUSD")]
    pub daily_borrow_usd: Decimal,
    #[serde(rename = "dailyRepayUSD")]
    pub daily_repay_usd: Decimal,
    #[serde(rename = "dailyLiquidateUSD")]
    pub daily_liquidate_usd: Decimal,

    pub block_number: u64,
    pub timestamp: TimeMs,
}

impl FinancialSnapshot {
    pub fn open(bucket: i64, protocol: &Protocol) -> Self {
        let mut snapshot = FinancialSnapshot {
            id: bucket.to_string(),
            bucket,
            protocol: protocol.id.clone(),
            total_value_locked_usd: Decimal::zero(),
            total_deposit_balance_usd: Decimal::zero(),
            total_borrow_balance_usd: Decimal::zero(),
            cumulative_supply_side_revenue_usd: Decimal::zero(),
            cumulative_protocol_side_revenue_usd: Decimal::zero(),
            cumulative_total_revenue_usd: Decimal::zero(),
            cumulative_deposit_usd: Decimal::zero(),
            cumulative_borrow_usd: Decimal::zero(),
            cumulative_liquidate_usd: Decimal::zero(),
            daily_supply_side_revenue_usd: Decimal::zero(),
            daily_protocol_side_revenue_usd: Decimal::zero(),
            daily_total_revenue_usd: Decimal::zero(),
            daily_deposit_usd: Decimal::zero(),
            daily_withdraw_usd: Decimal::zero(),
            daily_borrow_usd: Decimal::zero(),
            daily_repay_usd: Decimal::zero(),
            daily_liquidate_usd: Decimal::zero(),
            block_number: 0,
            timestamp: TimeMs::default(),
        };
        snapshot.carry_cumulative(protocol);
        snapshot
    }

    /// Overwrite totals and cumulative counters with the protocol's current values.
    pub fn carry_cumulative(&mut self, protocol: &Protocol) {
        self.total_value_locked_usd = protocol.total_value_locked_usd;
        self.total_deposit_balance_usd = protocol.total_deposit_balance_usd;
        self.total_borrow_balance_usd = protocol.total_borrow_balance_usd;
        self.cumulative_supply_side_revenue_usd = protocol.cumulative_supply_side_revenue_usd;
        self.cumulative_protocol_side_revenue_usd = protocol.cumulative_protocol_side_revenue_usd;
        self.cumulative_total_revenue_usd = protocol.cumulative_total_revenue_usd;
        self.cumulative_deposit_usd = protocol.cumulative_deposit_usd;
        self.cumulative_borrow_usd = protocol.cumulative_borrow_usd;
        self.cumulative_liquidate_usd = protocol.cumulative_liquidate_usd;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MS_PER_DAY, MS_PER_HOUR};

    #[test]
    fn test_period_buckets() {
        let t = TimeMs::new(2 * MS_PER_DAY + 3 * MS_PER_HOUR);
        assert_eq!(SnapshotPeriod::Daily.bucket(t), 2);
        assert_eq!(SnapshotPeriod::Hourly.bucket(t), 51);
    }

    #[test]
    fn test_market_snapshot_is_seeded_from_market() {
        let mut market = Market::new(AssetId::new("usdc"), "USD Coin".into(), TimeMs::new(0), 1);
        market.cumulative_deposit_usd = Decimal::from(250i64);
        market.input_token_balance = Amount::from(1000u64);

        let snap = MarketSnapshot::open(SnapshotPeriod::Daily, 4, &market, "burrow", 9, TimeMs::new(5));
        assert_eq!(snap.id, "usdc-4");
        assert_eq!(snap.cumulative_deposit_usd, Decimal::from(250i64));
        assert_eq!(snap.input_token_balance, Amount::from(1000u64));
        assert!(snap.deposit_usd.is_zero());
        assert_eq!(snap.block_number, 9);
    }
}
