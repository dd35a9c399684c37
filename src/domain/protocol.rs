use crate::domain::Decimal;
use serde::{Deserialize, Serialize};

/// Deployment-wide aggregate.
///
/// USD totals are recomputed from every market after each event; user and
/// position counters are maintained incrementally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Protocol {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub network: String,

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

    pub cumulative_unique_users: u64,
    pub cumulative_unique_depositors: u64,
    pub cumulative_unique_borrowers: u64,
    pub cumulative_unique_liquidators: u64,
    pub cumulative_unique_liquidatees: u64,

    pub open_position_count: u64,
    pub cumulative_position_count: u64,
    pub total_pool_count: u64,

    pub last_daily_bucket: Option<i64>,
    pub last_hourly_bucket: Option<i64>,
}

impl Protocol {
    pub fn new(id: &str, name: &str, slug: &str, network: &str) -> Self {
        Protocol {
            id: id.to_string(),
            name: name.to_string(),
            slug: slug.to_string(),
            network: network.to_string(),
            total_value_locked_usd: Decimal::zero(),
            total_deposit_balance_usd: Decimal::zero(),
            total_borrow_balance_usd: Decimal::zero(),
            cumulative_supply_side_revenue_usd: Decimal::zero(),
            cumulative_protocol_side_revenue_usd: Decimal::zero(),
            cumulative_total_revenue_usd: Decimal::zero(),
            cumulative_deposit_usd: Decimal::zero(),
            cumulative_borrow_usd: Decimal::zero(),
            cumulative_liquidate_usd: Decimal::zero(),
            cumulative_unique_users: 0,
            cumulative_unique_depositors: 0,
            cumulative_unique_borrowers: 0,
            cumulative_unique_liquidators: 0,
            cumulative_unique_liquidatees: 0,
            open_position_count: 0,
            cumulative_position_count: 0,
            total_pool_count: 0,
            last_daily_bucket: None,
            last_hourly_bucket: None,
        }
    }
}
