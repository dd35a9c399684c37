//! Hourly and daily rollups.
//!
//! Opening a new bucket first rewrites the previous bucket's cumulative
//! fields from the live entity, then seeds the new row from the same values.
//! Readers of a closed bucket therefore see its totals settle once the next
//! bucket opens.

use crate::domain::{
    AccountId, FinancialSnapshot, InterestRate, Market, MarketSnapshot, PositionSide, Protocol,
    SnapshotPeriod, UsageSnapshot,
};
use crate::engine::EventMeta;
use crate::store::Store;
use tracing::debug;

/// Open the market's snapshot rows for the event's buckets if they changed.
pub fn roll_market<S: Store>(store: &mut S, market: &mut Market, protocol_id: &str, meta: &EventMeta) {
    for period in SnapshotPeriod::ALL {
        let bucket = period.bucket(meta.timestamp);
        let previous = market.last_bucket(period);
        if previous == Some(bucket) {
            continue;
        }

        if let Some(prev) = previous {
            if let Some(mut closed) = store.market_snapshot(period, &MarketSnapshot::id_for(&market.id, prev)) {
                closed.carry_cumulative(market);
                store.save_market_snapshot(closed);
            }
        }

        let mut opened = MarketSnapshot::open(
            period,
            bucket,
            market,
            protocol_id,
            meta.block_number,
            meta.timestamp,
        );
        for side in [PositionSide::Lender, PositionSide::Borrower] {
            if let Some(rate) = store.interest_rate(&InterestRate::current_id(side, &market.id)) {
                let frozen = rate.for_bucket(period, bucket);
                opened.rates.push(frozen.id.clone());
                store.save_interest_rate(frozen);
            }
        }
        debug!(market = %market.id, period = period.as_str(), bucket, "market snapshot opened");
        store.save_market_snapshot(opened);
        market.set_last_bucket(period, bucket);
    }
}

/// Apply period deltas to the market's current daily and hourly rows.
pub fn market_delta<S, F>(store: &mut S, market: &Market, mut f: F)
where
    S: Store,
    F: FnMut(&mut MarketSnapshot),
{
    for period in SnapshotPeriod::ALL {
        let Some(bucket) = market.last_bucket(period) else { continue };
        if let Some(mut snap) = store.market_snapshot(period, &MarketSnapshot::id_for(&market.id, bucket)) {
            f(&mut snap);
            store.save_market_snapshot(snap);
        }
    }
}

/// Copy the market's post-event state into its current rows.
pub fn sync_market<S: Store>(store: &mut S, market: &Market, meta: &EventMeta) {
    market_delta(store, market, |snap| {
        snap.copy_state(market, meta.block_number, meta.timestamp)
    });
}

/// Open protocol-level usage and financial rows for the event's buckets.
pub fn roll_protocol<S: Store>(store: &mut S, protocol: &mut Protocol, meta: &EventMeta) {
    for period in SnapshotPeriod::ALL {
        let bucket = period.bucket(meta.timestamp);
        let previous = match period {
            SnapshotPeriod::Daily => protocol.last_daily_bucket,
            SnapshotPeriod::Hourly => protocol.last_hourly_bucket,
        };
        if previous == Some(bucket) {
            continue;
        }

        if let Some(prev) = previous {
            let prev_id = prev.to_string();
            if let Some(mut closed) = store.usage_snapshot(period, &prev_id) {
                closed.carry_cumulative(protocol);
                store.save_usage_snapshot(closed);
            }
            if period == SnapshotPeriod::Daily {
                if let Some(mut closed) = store.financial_snapshot(&prev_id) {
                    closed.carry_cumulative(protocol);
                    store.save_financial_snapshot(closed);
                }
            }
        }

        store.save_usage_snapshot(UsageSnapshot::open(period, bucket, protocol));
        match period {
            SnapshotPeriod::Daily => {
                store.save_financial_snapshot(FinancialSnapshot::open(bucket, protocol));
                protocol.last_daily_bucket = Some(bucket);
            }
            SnapshotPeriod::Hourly => protocol.last_hourly_bucket = Some(bucket),
        }
    }
}

pub fn usage_delta<S, F>(store: &mut S, protocol: &Protocol, mut f: F)
where
    S: Store,
    F: FnMut(&mut UsageSnapshot),
{
    for period in SnapshotPeriod::ALL {
        let bucket = match period {
            SnapshotPeriod::Daily => protocol.last_daily_bucket,
            SnapshotPeriod::Hourly => protocol.last_hourly_bucket,
        };
        let Some(bucket) = bucket else { continue };
        if let Some(mut snap) = store.usage_snapshot(period, &bucket.to_string()) {
            f(&mut snap);
            store.save_usage_snapshot(snap);
        }
    }
}

pub fn financial_delta<S, F>(store: &mut S, protocol: &Protocol, f: F)
where
    S: Store,
    F: FnOnce(&mut FinancialSnapshot),
{
    let Some(bucket) = protocol.last_daily_bucket else { return };
    if let Some(mut snap) = store.financial_snapshot(&bucket.to_string()) {
        f(&mut snap);
        store.save_financial_snapshot(snap);
    }
}

/// Count `account` once per bucket in the usage rows.
pub fn mark_active<S: Store>(store: &mut S, protocol: &Protocol, account: &AccountId, meta: &EventMeta) {
    for period in SnapshotPeriod::ALL {
        let bucket = period.bucket(meta.timestamp);
        let key = format!("{}-{}-{}", period.as_str(), account, bucket);
        if !store.mark_active_account(key) {
            continue;
        }
        if let Some(mut snap) = store.usage_snapshot(period, &bucket.to_string()) {
            snap.active_users += 1;
            store.save_usage_snapshot(snap);
        }
    }
}

/// Copy protocol totals into the current usage and financial rows.
pub fn sync_protocol<S: Store>(store: &mut S, protocol: &Protocol, meta: &EventMeta) {
    usage_delta(store, protocol, |snap| {
        snap.carry_cumulative(protocol);
        snap.block_number = meta.block_number;
        snap.timestamp = meta.timestamp;
    });
    financial_delta(store, protocol, |snap| {
        snap.carry_cumulative(protocol);
        snap.block_number = meta.block_number;
        snap.timestamp = meta.timestamp;
    });
}
