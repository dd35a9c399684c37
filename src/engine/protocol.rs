//! Protocol aggregate and per-market valuation.

use crate::config::ProtocolConfig;
use crate::domain::{Amount, AssetId, Decimal, Market, Protocol, Token};
use crate::store::Store;

pub fn get_or_create<S: Store>(store: &S, config: &ProtocolConfig) -> Protocol {
    store
        .protocol()
        .unwrap_or_else(|| Protocol::new(&config.id, &config.name, &config.slug, &config.network))
}

/// Recompute the USD totals as sums over every market.
pub fn refresh_totals<S: Store>(store: &S, protocol: &mut Protocol) {
    let mut tvl = Decimal::zero();
    let mut deposits = Decimal::zero();
    let mut borrows = Decimal::zero();
    let mut supply_revenue = Decimal::zero();
    let mut protocol_revenue = Decimal::zero();
    let mut total_revenue = Decimal::zero();
    let mut deposit_usd = Decimal::zero();
    let mut borrow_usd = Decimal::zero();
    let mut liquidate_usd = Decimal::zero();

    for id in store.market_ids() {
        let Some(m) = store.market(&id) else { continue };
        tvl += m.total_value_locked_usd;
        deposits += m.total_deposit_balance_usd;
        borrows += m.total_borrow_balance_usd;
        supply_revenue += m.cumulative_supply_side_revenue_usd;
        protocol_revenue += m.cumulative_protocol_side_revenue_usd;
        total_revenue += m.cumulative_total_revenue_usd;
        deposit_usd += m.cumulative_deposit_usd;
        borrow_usd += m.cumulative_borrow_usd;
        liquidate_usd += m.cumulative_liquidate_usd;
    }

    protocol.total_value_locked_usd = tvl;
    protocol.total_deposit_balance_usd = deposits;
    protocol.total_borrow_balance_usd = borrows;
    protocol.cumulative_supply_side_revenue_usd = supply_revenue;
    protocol.cumulative_protocol_side_revenue_usd = protocol_revenue;
    protocol.cumulative_total_revenue_usd = total_revenue;
    protocol.cumulative_deposit_usd = deposit_usd;
    protocol.cumulative_borrow_usd = borrow_usd;
    protocol.cumulative_liquidate_usd = liquidate_usd;
}

/// `inputTokenBalance / outputTokenSupply`, or 1 for an empty pool.
pub fn exchange_rate(market: &Market) -> Decimal {
    if market.output_token_supply.is_zero() {
        return Decimal::one();
    }
    market
        .input_token_balance
        .mul_div_floor(Amount::pow10(18), market.output_token_supply)
        .map(|r| r.to_decimal_units(18))
        .unwrap_or_else(Decimal::one)
}

/// Refresh price-derived fields of the market.
///
/// `reward_token` resolves the token a reward bucket pays out in.
pub fn revalue_market<F>(market: &mut Market, token: &Token, reward_token: F)
where
    F: Fn(&AssetId) -> Token,
{
    let price = token.price_or_zero();
    market.input_token_price_usd = price;
    market.exchange_rate = exchange_rate(market);
    market.output_token_price_usd = price.saturating_mul(market.exchange_rate);
    market.total_deposit_balance_usd = token.to_usd(market.input_token_balance);
    market.total_borrow_balance_usd = token.to_usd(market.total_borrowed);
    market.total_value_locked_usd = market.total_deposit_balance_usd;

    for reward in market.rewards.iter_mut() {
        let t = reward_token(&reward.reward_token);
        reward.usd_per_day = t.to_usd(reward.amount_per_day);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RewardEmission, TimeMs};
    use crate::store::InMemoryStore;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn priced(id: &str, decimals: u32, price: &str) -> Token {
        let mut t = Token::new(AssetId::new(id), id.into(), id.to_uppercase(), decimals);
        t.last_price_usd = Some(d(price));
        t
    }

    #[test]
    fn test_revalue_market() {
        let mut m = Market::new(AssetId::new("usdc"), "usdc".into(), TimeMs::new(0), 0);
        m.input_token_balance = Amount::from(3_000_000u64);
        m.output_token_supply = Amount::from(2_000_000u64);
        m.total_borrowed = Amount::from(1_000_000u64);
        m.rewards.push(RewardEmission {
            reward_token: AssetId::new("ref"),
            remaining: Amount::from(10u64),
            amount_per_day: Amount::from(4u64),
            usd_per_day: Decimal::zero(),
        });

        let token = priced("usdc", 6, "2");
        revalue_market(&mut m, &token, |_| priced("ref", 0, "0.25"));

        assert_eq!(m.input_token_price_usd, d("2"));
        assert_eq!(m.exchange_rate, d("1.5"));
        assert_eq!(m.output_token_price_usd, d("3"));
        assert_eq!(m.total_deposit_balance_usd, d("6"));
        assert_eq!(m.total_borrow_balance_usd, d("2"));
        assert_eq!(m.total_value_locked_usd, d("6"));
        assert_eq!(m.rewards[0].usd_per_day, d("1"));
    }

    #[test]
    fn test_empty_pool_exchange_rate_is_one() {
        let m = Market::new(AssetId::new("x"), "x".into(), TimeMs::new(0), 0);
        assert_eq!(exchange_rate(&m), Decimal::one());
    }

    #[test]
    fn test_refresh_totals_sums_markets() {
        let mut store = InMemoryStore::new();
        for (id, tvl) in [("a", "10"), ("b", "5.5")] {
            let mut m = Market::new(AssetId::new(id), id.into(), TimeMs::new(0), 0);
            m.total_value_locked_usd = d(tvl);
            m.cumulative_protocol_side_revenue_usd = d("1");
            store.save_market(m);
        }
        let mut protocol = get_or_create(&store, &ProtocolConfig::default());
        refresh_totals(&store, &mut protocol);
        assert_eq!(protocol.total_value_locked_usd, d("15.5"));
        assert_eq!(protocol.cumulative_protocol_side_revenue_usd, d("2"));
        assert_eq!(protocol.id, "burrow");
    }
}
