//! Utilization-driven interest rate model.
//!
//! Rates are per-millisecond multiplicative growth factors (`1` means no
//! accrual). The curve is piecewise linear with a single kink at the target
//! utilization.

use crate::domain::{Amount, Decimal, Market};
use crate::engine::compound::compound_factor;
use tracing::warn;

/// Fixed-point digits of the on-chain rate parameters.
pub const RATE_DECIMALS: u32 = 27;
/// Fixed-point digits used for utilization ratios.
pub const UTILIZATION_DECIMALS: u32 = 18;
/// Basis-point denominator for utilization and reserve ratios.
pub const BPS: u64 = 10_000;
/// Milliseconds in the 365-day year used for APR reporting.
pub const MS_PER_YEAR: i64 = 31_536_000_000;

/// Upper sanity bound for a per-millisecond rate.
pub fn max_sane_rate() -> Decimal {
    Decimal::from_scaled(11, 1)
}

/// Per-millisecond rate and whether the neutral default was substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateOutcome {
    pub rate: Decimal,
    pub guarded: bool,
}

impl RateOutcome {
    fn neutral(guarded: bool) -> Self {
        RateOutcome {
            rate: Decimal::one(),
            guarded,
        }
    }
}

/// Annualized rates in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AprPair {
    pub borrow: Decimal,
    pub supply: Decimal,
}

/// `num / den` as a decimal with 18 fractional digits; `None` if `den` is zero.
fn ratio(num: Amount, den: Amount) -> Option<Decimal> {
    num.mul_div_floor(Amount::pow10(UTILIZATION_DECIMALS), den)
        .map(|scaled| scaled.to_decimal_units(UTILIZATION_DECIMALS))
}

/// `totalBorrowed / (totalReserved + inputTokenBalance)`.
///
/// `None` when the market holds no deposits.
pub fn utilization(market: &Market) -> Option<Decimal> {
    if market.input_token_balance.is_zero() {
        return None;
    }
    ratio(
        market.total_borrowed,
        market.total_reserved + market.input_token_balance,
    )
}

fn curve(market: &Market, util: Decimal) -> Option<Decimal> {
    let one = Decimal::one();
    let target = Decimal::from(market.target_utilization as u64).checked_div(Decimal::from(BPS))?;
    let target_rate = market.target_utilization_rate.to_decimal_units(RATE_DECIMALS);
    let max_rate = market.max_utilization_rate.to_decimal_units(RATE_DECIMALS);

    if util <= target {
        if util.is_zero() {
            return Some(one);
        }
        let slope = target_rate.checked_sub(one)?.checked_div(target)?;
        one.checked_add(util.checked_mul(slope)?)
    } else {
        let excess = util.checked_sub(target)?;
        let span = max_rate.checked_sub(target_rate)?;
        let headroom = one.checked_sub(target)?;
        let slope = excess.checked_mul(span)?.checked_div(headroom)?;
        target_rate.checked_add(slope)
    }
}

/// Current per-millisecond borrow rate of the market.
///
/// Rates outside `[1, 1.1]` and arithmetic failures fall back to `1`.
pub fn per_ms_rate(market: &Market) -> RateOutcome {
    let util = match utilization(market) {
        Some(u) => u,
        None => return RateOutcome::neutral(false),
    };

    match curve(market, util) {
        Some(rate) if rate >= Decimal::one() && rate <= max_sane_rate() => RateOutcome {
            rate,
            guarded: false,
        },
        Some(rate) => {
            warn!(market = %market.id, %rate, %util, "rate outside sanity bound, using 1");
            RateOutcome::neutral(true)
        }
        None => {
            warn!(market = %market.id, %util, "rate curve arithmetic failed, using 1");
            RateOutcome::neutral(true)
        }
    }
}

/// Borrow and supply APR (percent) for a per-millisecond rate.
pub fn apr(market: &Market, rate: Decimal) -> AprPair {
    let annual = match compound_factor(rate, MS_PER_YEAR).and_then(|f| f.checked_sub(Decimal::one())) {
        Some(a) => a,
        None => {
            warn!(market = %market.id, %rate, "annual rate overflow, reporting zero");
            return AprPair::default();
        }
    };

    let borrow = annual.saturating_mul(Decimal::hundred());

    let utilized = ratio(market.total_borrowed, market.input_token_balance).unwrap_or_default();
    let reserve = Decimal::from(market.reserve_ratio as u64) / Decimal::from(BPS);
    let kept = if reserve > Decimal::one() {
        warn!(
            market = %market.id,
            reserve_ratio = market.reserve_ratio,
            "reserve ratio above 100%, supply APR is zero"
        );
        Decimal::zero()
    } else {
        Decimal::one() - reserve
    };
    let supply = annual
        .saturating_mul(utilized)
        .saturating_mul(kept)
        .saturating_mul(Decimal::hundred());

    AprPair { borrow, supply }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetId, TimeMs};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn a(s: &str) -> Amount {
        Amount::from_dec_str(s).unwrap()
    }

    /// Kink at 80%; 1.0001 per ms at the kink, 1.0003 at full utilization.
    fn market(balance: u64, borrowed: u64) -> Market {
        let mut m = Market::new(AssetId::new("usdc"), "usdc".into(), TimeMs::new(0), 0);
        m.target_utilization = 8000;
        m.target_utilization_rate = a("1000100000000000000000000000");
        m.max_utilization_rate = a("1000300000000000000000000000");
        m.reserve_ratio = 1000;
        m.input_token_balance = Amount::from(balance);
        m.total_borrowed = Amount::from(borrowed);
        m
    }

    #[test]
    fn test_empty_market_is_unit_rate() {
        let m = market(0, 0);
        assert_eq!(utilization(&m), None);
        assert_eq!(per_ms_rate(&m), RateOutcome::neutral(false));
    }

    #[test]
    fn test_utilization_includes_reserve() {
        let mut m = market(900, 500);
        m.total_reserved = Amount::from(100u64);
        assert_eq!(utilization(&m), Some(d("0.5")));
    }

    #[test]
    fn test_rate_at_kink() {
        let m = market(1000, 800);
        assert_eq!(per_ms_rate(&m).rate, d("1.0001"));
    }

    #[test]
    fn test_rate_below_kink_is_linear() {
        let m = market(1000, 400);
        assert_eq!(per_ms_rate(&m).rate, d("1.00005"));
    }

    #[test]
    fn test_rate_above_kink() {
        let m = market(1000, 900);
        // 1.0001 + 0.1 * 0.0002 / 0.2
        assert_eq!(per_ms_rate(&m).rate, d("1.0002"));
    }

    #[test]
    fn test_runaway_rate_is_guarded() {
        let mut m = market(1000, 800);
        m.target_utilization_rate = a("2000000000000000000000000000");
        let out = per_ms_rate(&m);
        assert!(out.guarded);
        assert_eq!(out.rate, Decimal::one());
    }

    #[test]
    fn test_rate_below_one_is_guarded() {
        let mut m = market(1000, 900);
        m.max_utilization_rate = a("500000000000000000000000000");
        let out = per_ms_rate(&m);
        assert!(out.guarded);
        assert_eq!(out.rate, Decimal::one());
    }

    #[test]
    fn test_unit_rate_has_zero_apr() {
        let m = market(1000, 0);
        let apr = apr(&m, Decimal::one());
        assert!(apr.borrow.is_zero());
        assert!(apr.supply.is_zero());
    }

    #[test]
    fn test_supply_apr_scaled_by_utilization_and_reserve() {
        let m = market(1000, 500);
        let rate = d("1.000000000001");
        let apr = apr(&m, rate);
        assert!(apr.borrow.is_positive());
        // supply = borrow * 0.5 * 0.9
        let expected = apr.borrow * d("0.45");
        let diff = (apr.supply - expected).abs();
        assert!(diff < d("0.0000000001"), "supply {} expected {}", apr.supply, expected);
    }

    #[test]
    fn test_reserve_ratio_above_full_zeroes_supply_apr() {
        let mut m = market(1000, 500);
        m.reserve_ratio = 12_000;
        let apr = apr(&m, d("1.000000000001"));
        assert!(apr.borrow.is_positive());
        assert!(apr.supply.is_zero());
    }
}
