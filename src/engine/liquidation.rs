//! Liquidation resolver.
//!
//! Debts are settled in the order the event lists them. After each debt a
//! pointer walks the collateral list, seizing whole collateral entries until
//! the discounted value seized covers the debt repaid so far. Whatever the
//! walk did not reach is swept at the end, so every listed collateral entry
//! moves exactly once.

use crate::domain::{
    Account, AssetAmount, Decimal, Liquidation, LiquidationRecord, PositionKey, PositionSide,
    Protocol,
};
use crate::engine::position_tracker::PositionTracker;
use crate::engine::{accounts, ledger, snapshots, Activity, EventMeta, LedgerEngine};
use crate::error::EngineError;
use crate::store::Store;
use tracing::{debug, warn};

/// `repaidUSD / collateralUSD`; 1 if the ratio cannot be formed.
pub fn discount_factor(liq: &Liquidation) -> Decimal {
    liq.repaid_usd
        .checked_div(liq.collateral_usd)
        .unwrap_or_else(Decimal::one)
}

/// Liquidator's share of a seized amount: `amountUSD × (1 − discount)`.
pub fn profit_usd(amount_usd: Decimal, discount: Decimal) -> Decimal {
    amount_usd.saturating_mul(Decimal::one() - discount)
}

/// Two accounts touched by one liquidation.
struct Parties {
    liquidator: Account,
    liquidatee: Account,
}

impl<S: Store> LedgerEngine<S> {
    pub(super) fn liquidate(
        &mut self,
        liq: &Liquidation,
        meta: &EventMeta,
        protocol: &mut Protocol,
    ) -> Result<(), EngineError> {
        let first_record = format!("{}-0", meta.record_id());
        if self.store.has_record(&first_record) {
            debug!(record = %first_record, "liquidation already recorded");
            return Ok(());
        }

        let mut parties = Parties {
            liquidator: accounts::get_or_create(&mut self.store, protocol, &liq.liquidator, meta),
            liquidatee: accounts::get_or_create(&mut self.store, protocol, &liq.liquidatee, meta),
        };
        let discount = discount_factor(liq);

        let mut repaid = Decimal::zero();
        let mut seized = Decimal::zero();
        let mut pointer = 0;
        let mut short_warned = false;
        for debt in &liq.debts {
            repaid += self.settle_debt(liq, debt, meta, protocol, &mut parties)?;
            while pointer < liq.collaterals.len() && seized.saturating_mul(discount) < repaid {
                seized += self.seize_collateral(liq, pointer, discount, meta, protocol, &mut parties)?;
                pointer += 1;
            }
            if pointer == liq.collaterals.len()
                && seized.saturating_mul(discount) < repaid
                && !short_warned
            {
                warn!(
                    liquidatee = %liq.liquidatee,
                    %repaid,
                    %seized,
                    "collateral exhausted before debt was covered"
                );
                short_warned = true;
            }
        }
        while pointer < liq.collaterals.len() {
            seized += self.seize_collateral(liq, pointer, discount, meta, protocol, &mut parties)?;
            pointer += 1;
        }

        let Parties {
            mut liquidator,
            mut liquidatee,
        } = parties;
        accounts::record_liquidator(&mut liquidator, protocol);
        accounts::record_activity(&mut liquidatee, protocol, Activity::Liquidation);
        snapshots::usage_delta(&mut self.store, protocol, |snap| {
            snap.transaction_count += 1;
            snap.liquidate_count += 1;
        });
        snapshots::mark_active(&mut self.store, protocol, &liq.liquidator, meta);
        snapshots::mark_active(&mut self.store, protocol, &liq.liquidatee, meta);
        self.store.save_account(liquidator);
        self.store.save_account(liquidatee);

        debug!(
            liquidator = %liq.liquidator,
            liquidatee = %liq.liquidatee,
            %repaid,
            %seized,
            %discount,
            "liquidation resolved"
        );
        Ok(())
    }

    /// Repay one debt entry on the liquidatee's behalf; returns its USD value.
    ///
    /// With paired deposits the liquidator funds the repayment out of their own
    /// deposit in the same market.
    fn settle_debt(
        &mut self,
        liq: &Liquidation,
        debt: &AssetAmount,
        meta: &EventMeta,
        protocol: &mut Protocol,
        parties: &mut Parties,
    ) -> Result<Decimal, EngineError> {
        let (mut market, token) = self.accrue(&debt.asset, meta, protocol)?;
        let paired = self.config.borrow_creates_deposit;
        let change = ledger::repay(&mut market, debt.amount, paired, self.config.share_accounting);
        self.stats.integrity_warnings += u64::from(change.integrity_warnings);

        let borrower = PositionKey::new(liq.liquidatee.clone(), debt.asset.clone(), PositionSide::Borrower);
        let funder = PositionKey::new(liq.liquidator.clone(), debt.asset.clone(), PositionSide::Lender);
        let mut tracker = PositionTracker::new(&mut self.store);
        let repaid = tracker.decrease(&borrower, debt.amount, meta, Activity::Liquidation)?;
        let funded = if paired {
            Some(tracker.decrease(&funder, debt.amount, meta, Activity::Transfer)?)
        } else {
            None
        };

        accounts::apply_transition(
            &mut market,
            &mut parties.liquidatee,
            protocol,
            PositionSide::Borrower,
            repaid.transition,
        );
        if let Some(funded) = funded {
            accounts::apply_transition(
                &mut market,
                &mut parties.liquidator,
                protocol,
                PositionSide::Lender,
                funded.transition,
            );
        }

        let usd = token.to_usd(debt.amount);
        self.finish_market(market, &token, meta);
        Ok(usd)
    }

    /// Move collateral entry `n` from the liquidatee's deposit to the
    /// liquidator's; returns the USD value moved.
    fn seize_collateral(
        &mut self,
        liq: &Liquidation,
        n: usize,
        discount: Decimal,
        meta: &EventMeta,
        protocol: &mut Protocol,
        parties: &mut Parties,
    ) -> Result<Decimal, EngineError> {
        let entry = &liq.collaterals[n];
        let (mut market, token) = self.accrue(&entry.asset, meta, protocol)?;
        let from = PositionKey::new(liq.liquidatee.clone(), entry.asset.clone(), PositionSide::Lender);
        let to = PositionKey::new(liq.liquidator.clone(), entry.asset.clone(), PositionSide::Lender);

        let mut tracker = PositionTracker::new(&mut self.store);
        let held = tracker
            .current(&from)
            .map(|p| p.balance)
            .ok_or_else(|| EngineError::missing("Position", from.counter_id()))?;
        let moved = entry.amount.min(held);
        if moved < entry.amount {
            warn!(
                liquidatee = %liq.liquidatee,
                market = %entry.asset,
                requested = %entry.amount,
                %held,
                "seized collateral exceeds deposit, moving what is held"
            );
            self.stats.integrity_warnings += 1;
        }
        let taken = tracker.decrease(&from, moved, meta, Activity::Liquidation)?;
        let given = tracker.increase(&to, moved, meta, Activity::Transfer);

        accounts::apply_transition(
            &mut market,
            &mut parties.liquidatee,
            protocol,
            PositionSide::Lender,
            taken.transition,
        );
        accounts::apply_transition(
            &mut market,
            &mut parties.liquidator,
            protocol,
            PositionSide::Lender,
            given.transition,
        );

        let amount_usd = token.to_usd(moved);
        market.cumulative_liquidate_usd += amount_usd;
        snapshots::market_delta(&mut self.store, &market, |snap| {
            snap.liquidate_usd += amount_usd;
            snap.liquidate_count += 1;
        });
        snapshots::financial_delta(&mut self.store, protocol, |snap| {
            snap.daily_liquidate_usd += amount_usd;
        });

        self.store.save_liquidation(LiquidationRecord {
            id: format!("{}-{}", meta.record_id(), n),
            hash: meta.hash.clone(),
            log_index: meta.log_index,
            liquidator: liq.liquidator.clone(),
            liquidatee: liq.liquidatee.clone(),
            market: market.id.clone(),
            asset: entry.asset.clone(),
            amount: moved,
            amount_usd,
            profit_usd: profit_usd(amount_usd, discount),
            position: taken.position.id,
            block_number: meta.block_number,
            timestamp: meta.timestamp,
        });
        self.finish_market(market, &token, meta);
        Ok(amount_usd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AccountId;

    fn liquidation(repaid: i64, collateral: i64) -> Liquidation {
        Liquidation {
            liquidator: AccountId::new("bob"),
            liquidatee: AccountId::new("alice"),
            debts: vec![],
            collaterals: vec![],
            repaid_usd: Decimal::from(repaid),
            collateral_usd: Decimal::from(collateral),
        }
    }

    #[test]
    fn test_discount_factor() {
        assert_eq!(discount_factor(&liquidation(90, 100)), Decimal::from_scaled(9, 1));
        assert_eq!(discount_factor(&liquidation(90, 0)), Decimal::one());
    }

    #[test]
    fn test_profit_is_discounted_share() {
        let profit = profit_usd(Decimal::from(100i64), Decimal::from_scaled(9, 1));
        assert_eq!(profit, Decimal::from(10i64));
    }
}
