//! Event dispatch and the per-kind handlers.
//!
//! Every handler follows the same shape: accrue interest on the touched
//! market, mutate the ledger and positions, roll the deltas into the current
//! snapshot rows, then revalue and save. The market is persisted as soon as
//! it has been compounded; everything else is written once the handler
//! succeeds.

use crate::datasource::PriceQuote;
use crate::domain::{
    Account, AssetConfigChange, AssetId, Decimal, EventKind, FarmReward, ForceClose, InterestRate,
    LedgerEvent, Market, PositionKey, PositionSide, PriceUpdate, Protocol, RewardEmission, Token,
    TransactionKind, TransactionRecord, Transfer,
};
use crate::engine::compound::compound;
use crate::engine::position_tracker::{PositionChange, PositionTracker};
use crate::engine::rates::{apr, per_ms_rate};
use crate::engine::{accounts, ledger, protocol, snapshots, Activity, EventMeta, LedgerEngine};
use crate::error::EngineError;
use crate::store::Store;
use tracing::{debug, info, warn};

impl<S: Store> LedgerEngine<S> {
    /// Run the handler for `event` between protocol roll-over and refresh.
    ///
    /// The protocol row is saved even when the handler fails so counters bumped
    /// before the failure are not lost.
    pub(super) fn apply(&mut self, event: &LedgerEvent) -> Result<(), EngineError> {
        let meta = EventMeta::from_event(event);
        let mut protocol = protocol::get_or_create(&self.store, &self.config);
        snapshots::roll_protocol(&mut self.store, &mut protocol, &meta);

        let result = match &event.kind {
            EventKind::AssetRegistered(change) => self.register_asset(change, &meta, &mut protocol),
            EventKind::AssetUpdated(change) => self.update_asset(change, &meta, &mut protocol),
            EventKind::PriceUpdated(update) => self.update_price(update, &meta),
            EventKind::FarmRewardAdded(reward) => self.add_farm_reward(reward, &meta, &mut protocol),
            EventKind::Deposit(t) => self.transfer(TransactionKind::Deposit, t, &meta, &mut protocol),
            EventKind::Withdraw(t) => self.transfer(TransactionKind::Withdraw, t, &meta, &mut protocol),
            EventKind::Borrow(t) => self.transfer(TransactionKind::Borrow, t, &meta, &mut protocol),
            EventKind::Repay(t) => self.transfer(TransactionKind::Repay, t, &meta, &mut protocol),
            EventKind::Liquidate(liq) => self.liquidate(liq, &meta, &mut protocol),
            EventKind::ForceClose(fc) => self.force_close(fc, &meta, &mut protocol),
        };

        protocol::refresh_totals(&self.store, &mut protocol);
        snapshots::sync_protocol(&mut self.store, &protocol, &meta);
        self.store.save_protocol(protocol);
        result
    }

    /// Token for `asset` carrying a USD price.
    ///
    /// A cached price wins. Otherwise the oracle is asked; a reverted call
    /// leaves the price unset (valued at zero) and is not cached.
    pub(super) fn priced_token(&mut self, asset: &AssetId, meta: &EventMeta) -> Token {
        let mut token = match self.store.token(asset) {
            Some(t) => t,
            None => self.describe_token(asset),
        };
        if token.last_price_usd.is_some() {
            return token;
        }

        let quote: PriceQuote = self.prices.usd_price(asset);
        if quote.reverted {
            warn!(asset = %asset, "price unavailable, valuing at zero");
            self.stats.price_unavailable += 1;
            return token;
        }
        token.last_price_usd = Some(quote.price.to_decimal_units(quote.decimals));
        token.last_price_block_number = Some(meta.block_number);
        self.store.save_token(token.clone());
        token
    }

    /// Fresh token row from the metadata collaborator, or the unknown defaults.
    fn describe_token(&self, asset: &AssetId) -> Token {
        match self.tokens.metadata(asset) {
            Some(m) => Token::new(asset.clone(), m.name, m.symbol, m.decimals),
            None => {
                warn!(asset = %asset, "token metadata unavailable, using defaults");
                Token::unknown(asset.clone())
            }
        }
    }

    /// Compound the market up to the event, credit the revenue and open the
    /// event's snapshot buckets.
    pub(super) fn accrue(
        &mut self,
        asset: &AssetId,
        meta: &EventMeta,
        protocol: &Protocol,
    ) -> Result<(Market, Token), EngineError> {
        let mut market = self
            .store
            .market(asset)
            .ok_or_else(|| EngineError::missing("Market", asset.as_str()))?;
        let token = self.priced_token(asset, meta);

        let accrual = compound(&mut market, meta.timestamp);
        if accrual.guarded {
            self.stats.numeric_guards += 1;
        }
        let protocol_side = token.to_usd(accrual.reserved);
        let supply_side = token.to_usd(accrual.supply_side);
        let total = protocol_side + supply_side;
        market.cumulative_protocol_side_revenue_usd += protocol_side;
        market.cumulative_supply_side_revenue_usd += supply_side;
        market.cumulative_total_revenue_usd += total;

        self.refresh_rates(&market);
        snapshots::roll_market(&mut self.store, &mut market, &self.config.id, meta);

        if !accrual.interest.is_zero() {
            snapshots::market_delta(&mut self.store, &market, |snap| {
                snap.protocol_side_revenue_usd += protocol_side;
                snap.supply_side_revenue_usd += supply_side;
                snap.total_revenue_usd += total;
            });
            snapshots::financial_delta(&mut self.store, protocol, |snap| {
                snap.daily_protocol_side_revenue_usd += protocol_side;
                snap.daily_supply_side_revenue_usd += supply_side;
                snap.daily_total_revenue_usd += total;
            });
        }

        self.store.save_market(market.clone());
        Ok((market, token))
    }

    fn refresh_rates(&mut self, market: &Market) {
        let outcome = per_ms_rate(market);
        let aprs = apr(market, outcome.rate);
        self.store
            .save_interest_rate(InterestRate::current(PositionSide::Borrower, &market.id, aprs.borrow));
        self.store
            .save_interest_rate(InterestRate::current(PositionSide::Lender, &market.id, aprs.supply));
    }

    /// Refresh price-derived fields, resolving reward tokens from the store.
    pub(super) fn revalue(&self, market: &mut Market, token: &Token) {
        let store = &self.store;
        protocol::revalue_market(market, token, |id| {
            store.token(id).unwrap_or_else(|| Token::unknown(id.clone()))
        });
    }

    /// Revalue, refresh the current rate rows, copy into the snapshot rows and persist.
    pub(super) fn finish_market(&mut self, mut market: Market, token: &Token, meta: &EventMeta) {
        self.revalue(&mut market, token);
        self.refresh_rates(&market);
        snapshots::sync_market(&mut self.store, &market, meta);
        self.store.save_market(market);
    }

    fn register_asset(
        &mut self,
        change: &AssetConfigChange,
        meta: &EventMeta,
        protocol: &mut Protocol,
    ) -> Result<(), EngineError> {
        if self.store.market(&change.asset).is_some() {
            warn!(market = %change.asset, "asset registered twice, applying as update");
            return self.update_asset(change, meta, protocol);
        }

        let mut token = match self.store.token(&change.asset) {
            Some(t) => t,
            None => self.describe_token(&change.asset),
        };
        token.extra_decimals = change.config.extra_decimals;
        self.store.save_token(token.clone());

        let mut market = Market::new(
            change.asset.clone(),
            token.name.clone(),
            meta.timestamp,
            meta.block_number,
        );
        market.apply_config(&change.config);
        protocol.total_pool_count += 1;

        self.store.save_market(market.clone());
        let (market, token) = self.accrue(&change.asset, meta, protocol)?;
        info!(market = %market.id, symbol = %token.symbol, "market registered");
        self.finish_market(market, &token, meta);
        Ok(())
    }

    fn update_asset(
        &mut self,
        change: &AssetConfigChange,
        meta: &EventMeta,
        protocol: &mut Protocol,
    ) -> Result<(), EngineError> {
        let (mut market, mut token) = self.accrue(&change.asset, meta, protocol)?;
        market.apply_config(&change.config);
        if token.extra_decimals != change.config.extra_decimals {
            token.extra_decimals = change.config.extra_decimals;
            self.store.save_token(token.clone());
        }
        debug!(market = %market.id, "market configuration updated");
        self.finish_market(market, &token, meta);
        Ok(())
    }

    /// Cache the quoted price and revalue the market without touching its clock.
    ///
    /// Opens the market's snapshot rows when the price is the first event of a bucket.
    fn update_price(&mut self, update: &PriceUpdate, meta: &EventMeta) -> Result<(), EngineError> {
        let mut token = match self.store.token(&update.asset) {
            Some(t) => t,
            None => self.describe_token(&update.asset),
        };
        token.last_price_usd = Some(update.price.to_decimal_units(update.decimals));
        token.last_price_block_number = Some(meta.block_number);
        self.store.save_token(token.clone());

        if let Some(mut market) = self.store.market(&update.asset) {
            snapshots::roll_market(&mut self.store, &mut market, &self.config.id, meta);
            self.revalue(&mut market, &token);
            snapshots::sync_market(&mut self.store, &market, meta);
            self.store.save_market(market);
        }
        Ok(())
    }

    fn add_farm_reward(
        &mut self,
        reward: &FarmReward,
        meta: &EventMeta,
        protocol: &mut Protocol,
    ) -> Result<(), EngineError> {
        let (mut market, token) = self.accrue(&reward.asset, meta, protocol)?;
        // Cache the reward token's price for the revaluation below.
        self.priced_token(&reward.reward_token, meta);

        match market
            .rewards
            .iter_mut()
            .find(|r| r.reward_token == reward.reward_token)
        {
            Some(bucket) => {
                bucket.remaining += reward.new_reward_amount;
                bucket.amount_per_day = reward.reward_per_day;
            }
            None => market.rewards.push(RewardEmission {
                reward_token: reward.reward_token.clone(),
                remaining: reward.new_reward_amount,
                amount_per_day: reward.reward_per_day,
                usd_per_day: Decimal::zero(),
            }),
        }
        self.finish_market(market, &token, meta);
        Ok(())
    }

    fn transfer(
        &mut self,
        kind: TransactionKind,
        transfer: &Transfer,
        meta: &EventMeta,
        protocol: &mut Protocol,
    ) -> Result<(), EngineError> {
        let record_id = meta.record_id();
        if self.store.has_record(&record_id) {
            debug!(record = %record_id, "transaction already recorded");
            return Ok(());
        }

        let (mut market, token) = self.accrue(&transfer.asset, meta, protocol)?;
        let mut account = accounts::get_or_create(&mut self.store, protocol, &transfer.account, meta);
        let mode = self.config.share_accounting;
        let paired = self.config.borrow_creates_deposit;
        let lender = PositionKey::new(
            transfer.account.clone(),
            transfer.asset.clone(),
            PositionSide::Lender,
        );
        let borrower = PositionKey::new(
            transfer.account.clone(),
            transfer.asset.clone(),
            PositionSide::Borrower,
        );
        let amount = transfer.amount;

        let (activity, change, warnings) = match kind {
            TransactionKind::Deposit => {
                let moved = ledger::deposit(&mut market, amount, mode);
                let change = PositionTracker::new(&mut self.store).increase(
                    &lender,
                    amount,
                    meta,
                    Activity::Deposit,
                );
                (Activity::Deposit, (PositionSide::Lender, change), moved.integrity_warnings)
            }
            TransactionKind::Withdraw => {
                let moved = ledger::withdraw(&mut market, amount, mode);
                let change = PositionTracker::new(&mut self.store).decrease(
                    &lender,
                    amount,
                    meta,
                    Activity::Withdraw,
                )?;
                (Activity::Withdraw, (PositionSide::Lender, change), moved.integrity_warnings)
            }
            TransactionKind::Borrow => {
                let moved = ledger::borrow(&mut market, amount, paired, mode);
                let mut tracker = PositionTracker::new(&mut self.store);
                let change = tracker.increase(&borrower, amount, meta, Activity::Borrow);
                if paired {
                    let deposit = tracker.increase(&lender, amount, meta, Activity::Transfer);
                    accounts::apply_transition(
                        &mut market,
                        &mut account,
                        protocol,
                        PositionSide::Lender,
                        deposit.transition,
                    );
                }
                (Activity::Borrow, (PositionSide::Borrower, change), moved.integrity_warnings)
            }
            TransactionKind::Repay => {
                let moved = ledger::repay(&mut market, amount, paired, mode);
                let mut tracker = PositionTracker::new(&mut self.store);
                let change = tracker.decrease(&borrower, amount, meta, Activity::Repay)?;
                let mut warnings = moved.integrity_warnings;
                if paired {
                    match tracker.decrease(&lender, amount, meta, Activity::Transfer) {
                        Ok(deposit) => accounts::apply_transition(
                            &mut market,
                            &mut account,
                            protocol,
                            PositionSide::Lender,
                            deposit.transition,
                        ),
                        Err(err) => {
                            warn!(account = %transfer.account, market = %transfer.asset, error = %err, "paired deposit missing on repay");
                            warnings += 1;
                        }
                    }
                }
                (Activity::Repay, (PositionSide::Borrower, change), warnings)
            }
        };
        self.stats.integrity_warnings += u64::from(warnings);

        let (side, PositionChange { position, transition }) = change;
        accounts::apply_transition(&mut market, &mut account, protocol, side, transition);
        accounts::record_activity(&mut account, protocol, activity);

        let amount_usd = token.to_usd(amount);
        match kind {
            TransactionKind::Deposit => market.cumulative_deposit_usd += amount_usd,
            TransactionKind::Borrow => market.cumulative_borrow_usd += amount_usd,
            TransactionKind::Withdraw | TransactionKind::Repay => {}
        }

        snapshots::market_delta(&mut self.store, &market, |snap| match kind {
            TransactionKind::Deposit => {
                snap.deposit_usd += amount_usd;
                snap.deposit_count += 1;
            }
            TransactionKind::Withdraw => {
                snap.withdraw_usd += amount_usd;
                snap.withdraw_count += 1;
            }
            TransactionKind::Borrow => {
                snap.borrow_usd += amount_usd;
                snap.borrow_count += 1;
            }
            TransactionKind::Repay => {
                snap.repay_usd += amount_usd;
                snap.repay_count += 1;
            }
        });
        snapshots::usage_delta(&mut self.store, protocol, |snap| {
            snap.transaction_count += 1;
            match kind {
                TransactionKind::Deposit => snap.deposit_count += 1,
                TransactionKind::Withdraw => snap.withdraw_count += 1,
                TransactionKind::Borrow => snap.borrow_count += 1,
                TransactionKind::Repay => snap.repay_count += 1,
            }
        });
        snapshots::financial_delta(&mut self.store, protocol, |snap| match kind {
            TransactionKind::Deposit => snap.daily_deposit_usd += amount_usd,
            TransactionKind::Withdraw => snap.daily_withdraw_usd += amount_usd,
            TransactionKind::Borrow => snap.daily_borrow_usd += amount_usd,
            TransactionKind::Repay => snap.daily_repay_usd += amount_usd,
        });
        snapshots::mark_active(&mut self.store, protocol, &transfer.account, meta);

        self.store.save_transaction(TransactionRecord {
            id: record_id,
            kind,
            hash: meta.hash.clone(),
            log_index: meta.log_index,
            account: transfer.account.clone(),
            market: market.id.clone(),
            asset: transfer.asset.clone(),
            amount,
            amount_usd,
            position: position.id,
            block_number: meta.block_number,
            timestamp: meta.timestamp,
        });
        self.store.save_account(account);
        self.finish_market(market, &token, meta);
        Ok(())
    }

    /// Zero every open position of an insolvent account.
    ///
    /// Seized deposits are credited to the reserve and written-off debt is
    /// charged against it.
    fn force_close(
        &mut self,
        fc: &ForceClose,
        meta: &EventMeta,
        protocol: &mut Protocol,
    ) -> Result<(), EngineError> {
        let mut account: Account = self
            .store
            .account(&fc.liquidatee)
            .ok_or_else(|| EngineError::missing("Account", fc.liquidatee.as_str()))?;
        account.touch(meta.timestamp);
        let mode = self.config.share_accounting;
        let mut closed = 0u32;

        for market_id in self.store.market_ids() {
            let keys = [PositionSide::Lender, PositionSide::Borrower]
                .map(|side| PositionKey::new(fc.liquidatee.clone(), market_id.clone(), side));
            let open: Vec<_> = {
                let tracker = PositionTracker::new(&mut self.store);
                keys.iter()
                    .filter_map(|k| tracker.current(k).map(|p| (k.clone(), p.balance)))
                    .collect()
            };
            if open.is_empty() {
                continue;
            }

            let (mut market, token) = self.accrue(&market_id, meta, protocol)?;
            for (key, balance) in open {
                let warnings = match key.side {
                    PositionSide::Lender => {
                        let before = market.input_token_balance + market.total_reserved;
                        let change = ledger::withdraw(&mut market, balance, mode);
                        let after = market.input_token_balance + market.total_reserved;
                        market.total_reserved += before.saturating_sub(after);
                        change.integrity_warnings
                    }
                    PositionSide::Borrower => {
                        ledger::debit_borrowed(&mut market, balance)
                            + ledger::debit_reserve(&mut market, balance)
                    }
                };
                self.stats.integrity_warnings += u64::from(warnings);

                let change = PositionTracker::new(&mut self.store).decrease(
                    &key,
                    balance,
                    meta,
                    Activity::Liquidation,
                )?;
                accounts::apply_transition(&mut market, &mut account, protocol, key.side, change.transition);
                closed += 1;
            }
            self.finish_market(market, &token, meta);
        }

        if closed > 0 {
            accounts::record_activity(&mut account, protocol, Activity::Liquidation);
            snapshots::usage_delta(&mut self.store, protocol, |snap| {
                snap.transaction_count += 1;
                snap.liquidate_count += 1;
            });
            snapshots::mark_active(&mut self.store, protocol, &fc.liquidatee, meta);
        }
        info!(account = %fc.liquidatee, positions = closed, "account force-closed");
        self.store.save_account(account);
        Ok(())
    }
}
