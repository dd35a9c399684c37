//! Causal ordering of ledger events.

use crate::domain::LedgerEvent;

/// Position of an event in the chain: block first, then log index.
///
/// The engine never reorders; this key only detects feeds that regress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventOrderingKey {
    pub block_number: u64,
    pub log_index: u64,
}

impl EventOrderingKey {
    pub fn from_event(event: &LedgerEvent) -> Self {
        EventOrderingKey {
            block_number: event.block_number,
            log_index: event.log_index,
        }
    }

    /// True if `next` sorts strictly before `prev`.
    pub fn is_regression(prev: &EventOrderingKey, next: &EventOrderingKey) -> bool {
        next < prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountId, Amount, AssetId, EventKind, TimeMs, Transfer};

    fn make_event(block_number: u64, log_index: u64) -> LedgerEvent {
        LedgerEvent {
            tx_hash: Some(format!("0x{}", block_number)),
            log_index,
            block_number,
            timestamp: TimeMs::new(block_number as i64 * 1000),
            kind: EventKind::Deposit(Transfer {
                account: AccountId::new("alice"),
                asset: AssetId::new("usdc"),
                amount: Amount::from(1u64),
            }),
        }
    }

    #[test]
    fn test_ordering_by_block_then_log_index() {
        let a = EventOrderingKey::from_event(&make_event(10, 5));
        let b = EventOrderingKey::from_event(&make_event(10, 6));
        let c = EventOrderingKey::from_event(&make_event(11, 0));
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_regression_detection() {
        let a = EventOrderingKey::from_event(&make_event(10, 5));
        let b = EventOrderingKey::from_event(&make_event(9, 7));
        assert!(EventOrderingKey::is_regression(&a, &b));
        assert!(!EventOrderingKey::is_regression(&b, &a));
        assert!(!EventOrderingKey::is_regression(&a, &a));
    }
}
