//! Pooled balance and share accounting for a single market.
//!
//! Balances never go negative. A subtraction that would underflow the
//! deposited balance is clamped at zero and the shortfall is taken out of the
//! reserve instead.

use crate::config::ShareAccounting;
use crate::domain::{Amount, Market};
use tracing::{debug, warn};

/// Shares moved by a ledger operation plus the number of clamps it needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerChange {
    pub shares: Amount,
    pub integrity_warnings: u32,
}

impl LedgerChange {
    fn merge(mut self, other: LedgerChange) -> LedgerChange {
        self.integrity_warnings += other.integrity_warnings;
        self
    }
}

/// Shares worth `amount` at the pool's current price.
///
/// An empty pool bootstraps 1:1.
pub fn amount_to_shares(amount: Amount, total_shares: Amount, total_amount: Amount) -> Amount {
    if total_amount.is_zero() {
        return amount;
    }
    amount
        .mul_div_floor(total_shares, total_amount)
        .unwrap_or(amount)
}

fn shares_for(market: &Market, amount: Amount, mode: ShareAccounting) -> Amount {
    match mode {
        ShareAccounting::Pooled => amount_to_shares(
            amount,
            market.output_token_supply,
            market.input_token_balance,
        ),
        ShareAccounting::OneToOne => amount,
    }
}

pub fn deposit(market: &mut Market, amount: Amount, mode: ShareAccounting) -> LedgerChange {
    let shares = shares_for(market, amount, mode);
    market.output_token_supply += shares;
    market.input_token_balance += amount;
    LedgerChange {
        shares,
        integrity_warnings: 0,
    }
}

pub fn withdraw(market: &mut Market, amount: Amount, mode: ShareAccounting) -> LedgerChange {
    let mut warnings = 0;
    let mut shares = shares_for(market, amount, mode);
    if shares > market.output_token_supply {
        shares = market.output_token_supply;
    }

    let redeemed = match mode {
        ShareAccounting::Pooled => shares
            .mul_div_floor(market.input_token_balance, market.output_token_supply)
            .unwrap_or_default(),
        ShareAccounting::OneToOne => amount,
    };

    market.output_token_supply = market.output_token_supply.saturating_sub(shares);
    warnings += debit_balance(market, redeemed);
    warnings += enforce_supply_invariant(market);

    LedgerChange {
        shares,
        integrity_warnings: warnings,
    }
}

pub fn borrow(
    market: &mut Market,
    amount: Amount,
    paired_deposit: bool,
    mode: ShareAccounting,
) -> LedgerChange {
    market.total_borrowed += amount;
    if paired_deposit {
        deposit(market, amount, mode)
    } else {
        LedgerChange::default()
    }
}

pub fn repay(
    market: &mut Market,
    amount: Amount,
    paired_deposit: bool,
    mode: ShareAccounting,
) -> LedgerChange {
    let change = LedgerChange {
        shares: Amount::zero(),
        integrity_warnings: debit_borrowed(market, amount),
    };
    if paired_deposit {
        withdraw(market, amount, mode).merge(change)
    } else {
        change
    }
}

/// Subtract from `inputTokenBalance`, moving any shortfall into the reserve.
pub fn debit_balance(market: &mut Market, amount: Amount) -> u32 {
    let (balance, shortfall) = market.input_token_balance.sub_with_shortfall(amount);
    market.input_token_balance = balance;
    if shortfall.is_zero() {
        return 0;
    }
    warn!(market = %market.id, %shortfall, "deposited balance would go negative, charging reserve");
    1 + debit_reserve(market, shortfall)
}

pub fn debit_reserve(market: &mut Market, amount: Amount) -> u32 {
    let (reserved, shortfall) = market.total_reserved.sub_with_shortfall(amount);
    market.total_reserved = reserved;
    if shortfall.is_zero() {
        return 0;
    }
    warn!(market = %market.id, %shortfall, "reserve would go negative, clamped to zero");
    1
}

pub fn debit_borrowed(market: &mut Market, amount: Amount) -> u32 {
    let (borrowed, shortfall) = market.total_borrowed.sub_with_shortfall(amount);
    market.total_borrowed = borrowed;
    if shortfall.is_zero() {
        return 0;
    }
    warn!(market = %market.id, %shortfall, "borrowed total would go negative, clamped to zero");
    1
}

/// Keep `outputTokenSupply == 0` iff `inputTokenBalance == 0`.
///
/// Dust left behind after the last share is burned moves to the reserve.
pub fn enforce_supply_invariant(market: &mut Market) -> u32 {
    if market.output_token_supply.is_zero() && !market.input_token_balance.is_zero() {
        debug!(market = %market.id, dust = %market.input_token_balance, "sweeping dust to reserve");
        market.total_reserved += market.input_token_balance;
        market.input_token_balance = Amount::zero();
        return 0;
    }
    if market.input_token_balance.is_zero() && !market.output_token_supply.is_zero() {
        warn!(market = %market.id, supply = %market.output_token_supply, "shares left without backing, zeroing supply");
        market.output_token_supply = Amount::zero();
        return 1;
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetId, TimeMs};

    fn empty() -> Market {
        Market::new(AssetId::new("usdc"), "usdc".into(), TimeMs::new(0), 0)
    }

    fn amt(v: u64) -> Amount {
        Amount::from(v)
    }

    #[test]
    fn test_bootstrap_deposit_is_one_to_one() {
        let mut m = empty();
        deposit(&mut m, amt(1000), ShareAccounting::Pooled);
        assert_eq!(m.input_token_balance, amt(1000));
        assert_eq!(m.output_token_supply, amt(1000));
        deposit(&mut m, amt(500), ShareAccounting::Pooled);
        assert_eq!(m.output_token_supply, amt(1500));
    }

    #[test]
    fn test_shares_priced_after_interest() {
        let mut m = empty();
        deposit(&mut m, amt(1000), ShareAccounting::Pooled);
        m.input_token_balance = amt(2000);
        let change = deposit(&mut m, amt(500), ShareAccounting::Pooled);
        assert_eq!(change.shares, amt(250));
    }

    #[test]
    fn test_amount_to_shares_monotonic() {
        let (shares, total) = (amt(777), amt(1013));
        let mut prev = Amount::zero();
        for a in 0..2000u64 {
            let s = amount_to_shares(amt(a), shares, total);
            assert!(s >= prev);
            prev = s;
        }
    }

    #[test]
    fn test_deposit_withdraw_round_trip() {
        let mut m = empty();
        deposit(&mut m, amt(1000), ShareAccounting::Pooled);
        let before = (m.input_token_balance, m.output_token_supply);
        deposit(&mut m, amt(333), ShareAccounting::Pooled);
        withdraw(&mut m, amt(333), ShareAccounting::Pooled);
        assert_eq!((m.input_token_balance, m.output_token_supply), before);
    }

    #[test]
    fn test_full_withdraw_empties_pool() {
        let mut m = empty();
        deposit(&mut m, amt(1000), ShareAccounting::Pooled);
        let change = withdraw(&mut m, amt(5000), ShareAccounting::Pooled);
        assert_eq!(change.shares, amt(1000));
        assert!(m.input_token_balance.is_zero());
        assert!(m.output_token_supply.is_zero());
        assert_eq!(change.integrity_warnings, 0);
    }

    #[test]
    fn test_one_to_one_shortfall_charges_reserve() {
        let mut m = empty();
        m.total_reserved = amt(50);
        deposit(&mut m, amt(100), ShareAccounting::OneToOne);
        let change = withdraw(&mut m, amt(120), ShareAccounting::OneToOne);
        assert!(m.input_token_balance.is_zero());
        assert_eq!(m.total_reserved, amt(30));
        assert_eq!(change.integrity_warnings, 1);
    }

    #[test]
    fn test_borrow_and_repay_with_paired_deposit() {
        let mut m = empty();
        deposit(&mut m, amt(1000), ShareAccounting::Pooled);
        borrow(&mut m, amt(200), true, ShareAccounting::Pooled);
        assert_eq!(m.total_borrowed, amt(200));
        assert_eq!(m.input_token_balance, amt(1200));
        assert_eq!(m.output_token_supply, amt(1200));

        repay(&mut m, amt(200), true, ShareAccounting::Pooled);
        assert!(m.total_borrowed.is_zero());
        assert_eq!(m.input_token_balance, amt(1000));
        assert_eq!(m.output_token_supply, amt(1000));
    }

    #[test]
    fn test_repay_more_than_borrowed_clamps() {
        let mut m = empty();
        borrow(&mut m, amt(100), false, ShareAccounting::Pooled);
        let change = repay(&mut m, amt(150), false, ShareAccounting::Pooled);
        assert!(m.total_borrowed.is_zero());
        assert_eq!(change.integrity_warnings, 1);
    }

    #[test]
    fn test_dust_swept_to_reserve() {
        let mut m = empty();
        m.input_token_balance = amt(3);
        assert_eq!(enforce_supply_invariant(&mut m), 0);
        assert!(m.input_token_balance.is_zero());
        assert_eq!(m.total_reserved, amt(3));
    }
}
