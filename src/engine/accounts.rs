//! Account registry and the counters that follow position lifecycles.

use crate::domain::{Account, AccountId, Market, PositionSide, Protocol};
use crate::engine::position_tracker::Transition;
use crate::engine::{Activity, EventMeta};
use crate::store::Store;

/// Load an account, creating it (and counting a new unique user) on first use.
pub fn get_or_create<S: Store>(
    store: &mut S,
    protocol: &mut Protocol,
    id: &AccountId,
    meta: &EventMeta,
) -> Account {
    match store.account(id) {
        Some(mut account) => {
            account.touch(meta.timestamp);
            account
        }
        None => {
            protocol.cumulative_unique_users += 1;
            let account = Account::new(id.clone(), meta.timestamp, meta.block_number);
            store.save_account(account.clone());
            account
        }
    }
}

/// Bump the account's per-type counter and the protocol's unique-role counters.
pub fn record_activity(account: &mut Account, protocol: &mut Protocol, activity: Activity) {
    match activity {
        Activity::Deposit => {
            if account.deposit_count == 0 {
                protocol.cumulative_unique_depositors += 1;
            }
            account.deposit_count += 1;
        }
        Activity::Withdraw => account.withdraw_count += 1,
        Activity::Borrow => {
            if account.borrow_count == 0 {
                protocol.cumulative_unique_borrowers += 1;
            }
            account.borrow_count += 1;
        }
        Activity::Repay => account.repay_count += 1,
        Activity::Liquidation => {
            if account.liquidation_count == 0 {
                protocol.cumulative_unique_liquidatees += 1;
            }
            account.liquidation_count += 1;
        }
        Activity::Transfer => {}
    }
}

/// Count a liquidation performed by `account`.
pub fn record_liquidator(account: &mut Account, protocol: &mut Protocol) {
    if account.liquidate_count == 0 {
        protocol.cumulative_unique_liquidators += 1;
    }
    account.liquidate_count += 1;
}

/// Apply a position open/close to the market, account and protocol counters.
pub fn apply_transition(
    market: &mut Market,
    account: &mut Account,
    protocol: &mut Protocol,
    side: PositionSide,
    transition: Transition,
) {
    match transition {
        Transition::Opened => {
            market.open_position_count += 1;
            match side {
                PositionSide::Lender => market.lending_position_count += 1,
                PositionSide::Borrower => market.borrowing_position_count += 1,
            }
            account.open_position_count += 1;
            account.position_count += 1;
            protocol.open_position_count += 1;
            protocol.cumulative_position_count += 1;
        }
        Transition::Closed => {
            market.open_position_count = market.open_position_count.saturating_sub(1);
            market.closed_position_count += 1;
            match side {
                PositionSide::Lender => {
                    market.lending_position_count = market.lending_position_count.saturating_sub(1)
                }
                PositionSide::Borrower => {
                    market.borrowing_position_count =
                        market.borrowing_position_count.saturating_sub(1)
                }
            }
            account.open_position_count = account.open_position_count.saturating_sub(1);
            account.closed_position_count += 1;
            protocol.open_position_count = protocol.open_position_count.saturating_sub(1);
        }
        Transition::Adjusted => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetId, TimeMs};
    use crate::store::InMemoryStore;

    fn meta(ts: i64) -> EventMeta {
        EventMeta {
            hash: "0x1".into(),
            log_index: 0,
            block_number: 1,
            timestamp: TimeMs::new(ts),
        }
    }

    #[test]
    fn test_get_or_create_counts_unique_users_once() {
        let mut store = InMemoryStore::new();
        let mut protocol = Protocol::new("p", "P", "p", "near");
        let id = AccountId::new("alice");
        get_or_create(&mut store, &mut protocol, &id, &meta(1));
        let again = get_or_create(&mut store, &mut protocol, &id, &meta(5));
        assert_eq!(protocol.cumulative_unique_users, 1);
        assert_eq!(again.last_active_timestamp, TimeMs::new(5));
        assert_eq!(again.created_timestamp, TimeMs::new(1));
    }

    #[test]
    fn test_unique_depositors_and_borrowers() {
        let mut protocol = Protocol::new("p", "P", "p", "near");
        let mut account = Account::new(AccountId::new("a"), TimeMs::new(0), 0);
        record_activity(&mut account, &mut protocol, Activity::Deposit);
        record_activity(&mut account, &mut protocol, Activity::Deposit);
        record_activity(&mut account, &mut protocol, Activity::Borrow);
        assert_eq!(account.deposit_count, 2);
        assert_eq!(protocol.cumulative_unique_depositors, 1);
        assert_eq!(protocol.cumulative_unique_borrowers, 1);
    }

    #[test]
    fn test_transition_counters() {
        let mut protocol = Protocol::new("p", "P", "p", "near");
        let mut account = Account::new(AccountId::new("a"), TimeMs::new(0), 0);
        let mut market = Market::new(AssetId::new("m"), "m".into(), TimeMs::new(0), 0);

        apply_transition(&mut market, &mut account, &mut protocol, PositionSide::Borrower, Transition::Opened);
        assert_eq!(market.open_position_count, 1);
        assert_eq!(market.borrowing_position_count, 1);
        assert_eq!(protocol.cumulative_position_count, 1);

        apply_transition(&mut market, &mut account, &mut protocol, PositionSide::Borrower, Transition::Closed);
        assert_eq!(market.open_position_count, 0);
        assert_eq!(market.closed_position_count, 1);
        assert_eq!(market.borrowing_position_count, 0);
        assert_eq!(account.closed_position_count, 1);
        assert_eq!(protocol.open_position_count, 0);
        assert_eq!(protocol.cumulative_position_count, 1);
    }
}
