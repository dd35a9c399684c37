//! Interest accrual over elapsed time.

use crate::domain::{Amount, Decimal, Market, TimeMs, MS_PER_DAY};
use crate::engine::rates::{per_ms_rate, BPS};
use tracing::{debug, warn};

/// Result of advancing a market's interest clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Accrual {
    /// Per-millisecond rate the interval was compounded at.
    pub rate: Decimal,
    pub interest: Amount,
    /// Protocol share of `interest`.
    pub reserved: Amount,
    /// Depositor share of `interest`.
    pub supply_side: Amount,
    /// A neutral default replaced a failed computation.
    pub guarded: bool,
}

/// Four-term binomial approximation of `rate^n`.
///
/// `1 + n·x + (n/2)(n−1)x² + (n/6)(n−1)(n−2)x³ + (n/12)(n−1)(n−2)(n−3)x⁴`
/// with `x = rate − 1`. Each `(n−k)·x` factor is formed before multiplying so
/// intermediates stay near the magnitude of the result. Rounding can therefore
/// differ from the literal `(n/12)(n−1)(n−2)(n−3)x⁴` order in the last decimal
/// digit. `None` on overflow.
pub fn compound_factor(rate: Decimal, n: i64) -> Option<Decimal> {
    let one = Decimal::one();
    if n <= 0 {
        return Some(one);
    }
    let x = rate.checked_sub(one)?;
    let n = Decimal::from(n);

    let f0 = n.checked_mul(x)?;
    let f1 = n.checked_sub(Decimal::from(1i64))?.checked_mul(x)?;
    let f2 = n.checked_sub(Decimal::from(2i64))?.checked_mul(x)?;
    let f3 = n.checked_sub(Decimal::from(3i64))?.checked_mul(x)?;

    let p2 = f0.checked_mul(f1)?;
    let p3 = p2.checked_mul(f2)?;
    let p4 = p3.checked_mul(f3)?;

    let t2 = p2.checked_div(Decimal::from(2i64))?;
    let t3 = p3.checked_div(Decimal::from(6i64))?;
    let t4 = p4.checked_div(Decimal::from(12i64))?;

    one.checked_add(f0)?
        .checked_add(t2)?
        .checked_add(t3)?
        .checked_add(t4)
}

/// Advance the market clock to `now` at the market's current rate.
pub fn compound(market: &mut Market, now: TimeMs) -> Accrual {
    let elapsed = now.as_ms() - market.last_update_timestamp.as_ms();
    let outcome = per_ms_rate(market);
    let mut accrual = compound_at_rate(market, elapsed, outcome.rate);
    accrual.guarded |= outcome.guarded;
    accrual
}

/// Advance the market clock by `elapsed` ms at a fixed per-millisecond `rate`.
///
/// Non-positive `elapsed` leaves the market untouched.
pub fn compound_at_rate(market: &mut Market, elapsed: i64, rate: Decimal) -> Accrual {
    let mut accrual = Accrual {
        rate,
        ..Accrual::default()
    };
    if elapsed <= 0 {
        return accrual;
    }

    let growth = compound_factor(rate, elapsed).and_then(|f| f.checked_sub(Decimal::one()));
    let interest = match growth.and_then(|g| market.total_borrowed.mul_decimal_floor(g)) {
        Some(i) => i,
        None => {
            warn!(market = %market.id, %rate, elapsed, "compound factor overflow, using 1");
            accrual.guarded = true;
            Amount::zero()
        }
    };

    let reserved = interest
        .mul_div_floor(Amount::from(market.reserve_ratio as u64), Amount::from(BPS))
        .unwrap_or_default();
    let supply_side = interest.saturating_sub(reserved);

    market.total_reserved += reserved;
    market.input_token_balance += supply_side;
    market.total_borrowed += interest;

    decay_rewards(market, elapsed);

    market.last_update_timestamp = TimeMs::new(market.last_update_timestamp.as_ms() + elapsed);

    debug!(market = %market.id, elapsed, %interest, %reserved, "compounded");

    accrual.interest = interest;
    accrual.reserved = reserved;
    accrual.supply_side = supply_side;
    accrual
}

/// Drain each reward bucket by its emission over `elapsed`.
///
/// A bucket left with less than one interval's emission is cut off entirely.
fn decay_rewards(market: &mut Market, elapsed: i64) {
    let elapsed = Amount::from(elapsed as u64);
    let day = Amount::from(MS_PER_DAY as u64);
    for reward in market.rewards.iter_mut() {
        let emitted = reward
            .amount_per_day
            .mul_div_floor(elapsed, day)
            .unwrap_or_default();
        reward.remaining = reward.remaining.saturating_sub(emitted);
        if reward.remaining < emitted {
            reward.remaining = Amount::zero();
            reward.amount_per_day = Amount::zero();
            reward.usd_per_day = Decimal::zero();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetId, RewardEmission};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn market() -> Market {
        let mut m = Market::new(AssetId::new("usdc"), "usdc".into(), TimeMs::new(0), 0);
        m.reserve_ratio = 1000;
        m.input_token_balance = Amount::from(1000u64);
        m.output_token_supply = Amount::from(1000u64);
        m.total_borrowed = Amount::from(200u64);
        m
    }

    #[test]
    fn test_factor_small_n() {
        // n = 1: only the linear term survives.
        assert_eq!(compound_factor(d("1.5"), 1), Some(d("1.5")));
        // n = 2: 1 + 2x + x^2
        assert_eq!(compound_factor(d("1.1"), 2), Some(d("1.21")));
    }

    #[test]
    fn test_factor_uses_twelfth_for_fourth_term() {
        // n = 4, x = 1: 1 + 4 + 6 + 4 + (4*3*2*1)/12
        assert_eq!(compound_factor(d("2"), 4), Some(d("17")));
    }

    #[test]
    fn test_factor_matches_literal_order_when_exact() {
        // x = 0.0001: 1 + 4x + 6x^2 + 4x^3 + 2x^4, no digits lost either way.
        assert_eq!(
            compound_factor(d("1.0001"), 4),
            Some(d("1.0004000600040002"))
        );
    }

    #[test]
    fn test_factor_overflow_is_none() {
        assert_eq!(compound_factor(d("1.1"), 1_000_000_000_000), None);
    }

    #[test]
    fn test_zero_elapsed_is_noop() {
        let mut m = market();
        let before = m.clone();
        let acc = compound_at_rate(&mut m, 0, d("1.0001"));
        assert_eq!(m, before);
        assert!(acc.reserved.is_zero());
        assert!(acc.supply_side.is_zero());
    }

    #[test]
    fn test_interest_split_and_clock() {
        let mut m = market();
        let acc = compound_at_rate(&mut m, 10, d("1.01"));
        // factor = 1 + 0.1 + 0.0045 + 0.00012 + 0.0000042 = 1.1046242
        assert_eq!(acc.interest, Amount::from(20u64));
        assert_eq!(acc.reserved, Amount::from(2u64));
        assert_eq!(acc.supply_side, Amount::from(18u64));
        assert_eq!(m.total_borrowed, Amount::from(220u64));
        assert_eq!(m.total_reserved, Amount::from(2u64));
        assert_eq!(m.input_token_balance, Amount::from(1018u64));
        assert_eq!(m.last_update_timestamp, TimeMs::new(10));
    }

    #[test]
    fn test_overflow_accrues_nothing_but_advances_clock() {
        let mut m = market();
        let acc = compound_at_rate(&mut m, 1_000_000_000_000, d("1.1"));
        assert!(acc.guarded);
        assert!(acc.interest.is_zero());
        assert_eq!(m.total_borrowed, Amount::from(200u64));
        assert_eq!(m.last_update_timestamp, TimeMs::new(1_000_000_000_000));
    }

    #[test]
    fn test_reward_decay_and_cutoff() {
        let mut m = market();
        m.rewards.push(RewardEmission {
            reward_token: AssetId::new("ref"),
            remaining: Amount::from(250u64),
            amount_per_day: Amount::from(100u64),
            usd_per_day: d("10"),
        });
        compound_at_rate(&mut m, MS_PER_DAY, Decimal::one());
        assert_eq!(m.rewards[0].remaining, Amount::from(150u64));
        compound_at_rate(&mut m, MS_PER_DAY, Decimal::one());
        // 50 left is below one day's emission.
        assert!(m.rewards[0].remaining.is_zero());
        assert!(m.rewards[0].amount_per_day.is_zero());
        assert!(m.rewards[0].usd_per_day.is_zero());
    }
}
