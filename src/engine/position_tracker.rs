use crate::domain::{
    Amount, Position, PositionCounter, PositionKey, PositionSnapshot, Token,
};
use crate::engine::{Activity, EventMeta};
use crate::error::EngineError;
use crate::store::Store;
use tracing::debug;

/// What a balance change did to the position's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A new position was minted under the current counter.
    Opened,
    /// Balance changed; the position stays open.
    Adjusted,
    /// Balance reached zero and the counter moved on.
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionChange {
    pub position: Position,
    pub transition: Transition,
}

/// Lifecycle of positions keyed by (account, market, side).
///
/// absent -> open -> closed -> reopened under the next counter. A closed
/// position is never written again.
pub struct PositionTracker<'a, S: Store> {
    store: &'a mut S,
}

impl<'a, S: Store> PositionTracker<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Add to the current position, opening one if needed.
    pub fn increase(
        &mut self,
        key: &PositionKey,
        amount: Amount,
        meta: &EventMeta,
        activity: Activity,
    ) -> PositionChange {
        let counter_id = key.counter_id();
        let counter = match self.store.position_counter(&counter_id) {
            Some(c) => c,
            None => {
                let c = PositionCounter {
                    id: counter_id,
                    next_count: 0,
                    last_timestamp: meta.timestamp,
                };
                self.store.save_position_counter(c.clone());
                c
            }
        };

        let (mut position, transition) = match self
            .store
            .position(&key.position_id(counter.next_count))
        {
            Some(p) if !p.is_closed() => (p, Transition::Adjusted),
            _ => {
                let p = Position::open(
                    key,
                    counter.next_count,
                    &meta.hash,
                    meta.block_number,
                    meta.timestamp,
                );
                debug!(position = %p.id, "position opened");
                (p, Transition::Opened)
            }
        };

        position.balance += amount;
        bump(&mut position, activity);
        self.commit(position, transition, meta)
    }

    /// Take from the current position, closing it when the balance runs out.
    ///
    /// Fails if the key has never been opened or its current position is gone.
    pub fn decrease(
        &mut self,
        key: &PositionKey,
        amount: Amount,
        meta: &EventMeta,
        activity: Activity,
    ) -> Result<PositionChange, EngineError> {
        let counter_id = key.counter_id();
        let mut counter = self
            .store
            .position_counter(&counter_id)
            .ok_or_else(|| EngineError::missing("PositionCounter", counter_id.clone()))?;

        let position_id = key.position_id(counter.next_count);
        let mut position = self
            .store
            .position(&position_id)
            .filter(|p| !p.is_closed())
            .ok_or_else(|| EngineError::missing("Position", position_id))?;

        bump(&mut position, activity);

        let transition = if amount >= position.balance {
            position.balance = Amount::zero();
            position.hash_closed = Some(meta.hash.clone());
            position.block_number_closed = Some(meta.block_number);
            position.timestamp_closed = Some(meta.timestamp);

            counter.next_count += 1;
            counter.last_timestamp = meta.timestamp;
            self.store.save_position_counter(counter);
            debug!(position = %position.id, "position closed");
            Transition::Closed
        } else {
            position.balance = position.balance.saturating_sub(amount);
            Transition::Adjusted
        };

        Ok(self.commit(position, transition, meta))
    }

    /// Currently open position for the key, if any.
    pub fn current(&self, key: &PositionKey) -> Option<Position> {
        let counter = self.store.position_counter(&key.counter_id())?;
        self.store
            .position(&key.position_id(counter.next_count))
            .filter(|p| !p.is_closed())
    }

    fn commit(
        &mut self,
        position: Position,
        transition: Transition,
        meta: &EventMeta,
    ) -> PositionChange {
        let token = self
            .store
            .token(&position.market)
            .unwrap_or_else(|| Token::unknown(position.market.clone()));

        self.store.save_position_snapshot(PositionSnapshot {
            id: format!("{}-{}-{}", position.id, meta.hash, meta.log_index),
            position: position.id.clone(),
            hash: meta.hash.clone(),
            log_index: meta.log_index,
            balance: position.balance,
            balance_usd: token.to_usd(position.balance),
            block_number: meta.block_number,
            timestamp: meta.timestamp,
        });
        self.store.save_position(position.clone());

        PositionChange {
            position,
            transition,
        }
    }
}

fn bump(position: &mut Position, activity: Activity) {
    match activity {
        Activity::Deposit => position.deposit_count += 1,
        Activity::Withdraw => position.withdraw_count += 1,
        Activity::Borrow => position.borrow_count += 1,
        Activity::Repay => position.repay_count += 1,
        Activity::Liquidation => position.liquidation_count += 1,
        Activity::Transfer => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountId, AssetId, PositionSide, TimeMs};
    use crate::store::InMemoryStore;

    fn meta(n: u64) -> EventMeta {
        EventMeta {
            hash: format!("0x{}", n),
            log_index: 0,
            block_number: n,
            timestamp: TimeMs::new(n as i64 * 1000),
        }
    }

    fn key() -> PositionKey {
        PositionKey::new(AccountId::new("alice"), AssetId::new("usdc"), PositionSide::Lender)
    }

    #[test]
    fn test_open_adjust_close() {
        let mut store = InMemoryStore::new();
        let mut tracker = PositionTracker::new(&mut store);

        let c = tracker.increase(&key(), Amount::from(100u64), &meta(1), Activity::Deposit);
        assert_eq!(c.transition, Transition::Opened);
        assert_eq!(c.position.id, "alice-usdc-LENDER-0");

        let c = tracker.increase(&key(), Amount::from(50u64), &meta(2), Activity::Deposit);
        assert_eq!(c.transition, Transition::Adjusted);
        assert_eq!(c.position.balance, Amount::from(150u64));
        assert_eq!(c.position.deposit_count, 2);

        let c = tracker
            .decrease(&key(), Amount::from(40u64), &meta(3), Activity::Withdraw)
            .unwrap();
        assert_eq!(c.transition, Transition::Adjusted);
        assert_eq!(c.position.balance, Amount::from(110u64));

        let c = tracker
            .decrease(&key(), Amount::from(1000u64), &meta(4), Activity::Withdraw)
            .unwrap();
        assert_eq!(c.transition, Transition::Closed);
        assert!(c.position.balance.is_zero());
        assert_eq!(c.position.hash_closed.as_deref(), Some("0x4"));
        assert!(tracker.current(&key()).is_none());
    }

    #[test]
    fn test_reopen_uses_next_counter() {
        let mut store = InMemoryStore::new();
        let mut tracker = PositionTracker::new(&mut store);
        tracker.increase(&key(), Amount::from(10u64), &meta(1), Activity::Deposit);
        tracker
            .decrease(&key(), Amount::from(10u64), &meta(2), Activity::Withdraw)
            .unwrap();

        let c = tracker.increase(&key(), Amount::from(7u64), &meta(3), Activity::Deposit);
        assert_eq!(c.transition, Transition::Opened);
        assert_eq!(c.position.id, "alice-usdc-LENDER-1");

        let old = store.position("alice-usdc-LENDER-0").unwrap();
        assert!(old.is_closed());
        assert!(old.balance.is_zero());
    }

    #[test]
    fn test_decrease_without_counter_is_missing_reference() {
        let mut store = InMemoryStore::new();
        let mut tracker = PositionTracker::new(&mut store);
        let err = tracker
            .decrease(&key(), Amount::from(1u64), &meta(1), Activity::Withdraw)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::MissingReference { entity: "PositionCounter", .. }
        ));
    }

    #[test]
    fn test_decrease_after_close_is_missing_reference() {
        let mut store = InMemoryStore::new();
        let mut tracker = PositionTracker::new(&mut store);
        tracker.increase(&key(), Amount::from(10u64), &meta(1), Activity::Deposit);
        tracker
            .decrease(&key(), Amount::from(10u64), &meta(2), Activity::Withdraw)
            .unwrap();
        let err = tracker
            .decrease(&key(), Amount::from(1u64), &meta(3), Activity::Withdraw)
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingReference { entity: "Position", .. }));
    }

    #[test]
    fn test_every_change_snapshots_balance() {
        let mut store = InMemoryStore::new();
        {
            let mut tracker = PositionTracker::new(&mut store);
            tracker.increase(&key(), Amount::from(10u64), &meta(1), Activity::Deposit);
            tracker.increase(&key(), Amount::from(5u64), &meta(2), Activity::Deposit);
        }
        let balances: Vec<Amount> = store.position_snapshots().map(|s| s.balance).collect();
        assert_eq!(balances.len(), 2);
        assert!(balances.contains(&Amount::from(15u64)));
    }
}
