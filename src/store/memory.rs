use super::Store;
use crate::domain::{
    Account, AccountId, AssetId, FinancialSnapshot, InterestRate, LiquidationRecord, Market,
    MarketSnapshot, Position, PositionCounter, PositionSnapshot, Protocol, SnapshotPeriod, Token,
    TransactionRecord, UsageSnapshot,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Map-backed store; serializes to the full entity set.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InMemoryStore {
    protocol: Option<Protocol>,
    tokens: BTreeMap<String, Token>,
    markets: BTreeMap<String, Market>,
    accounts: BTreeMap<String, Account>,
    position_counters: BTreeMap<String, PositionCounter>,
    positions: BTreeMap<String, Position>,
    position_snapshots: BTreeMap<String, PositionSnapshot>,
    interest_rates: BTreeMap<String, InterestRate>,
    daily_market_snapshots: BTreeMap<String, MarketSnapshot>,
    hourly_market_snapshots: BTreeMap<String, MarketSnapshot>,
    daily_usage_snapshots: BTreeMap<String, UsageSnapshot>,
    hourly_usage_snapshots: BTreeMap<String, UsageSnapshot>,
    financial_snapshots: BTreeMap<String, FinancialSnapshot>,
    transactions: BTreeMap<String, TransactionRecord>,
    liquidations: BTreeMap<String, LiquidationRecord>,
    #[serde(skip)]
    active_accounts: BTreeSet<String>,
    #[serde(skip)]
    processed_events: BTreeSet<String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn position_snapshots(&self) -> impl Iterator<Item = &PositionSnapshot> {
        self.position_snapshots.values()
    }

    pub fn transactions(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.transactions.values()
    }

    pub fn liquidations(&self) -> impl Iterator<Item = &LiquidationRecord> {
        self.liquidations.values()
    }

    pub fn market_snapshots(&self, period: SnapshotPeriod) -> impl Iterator<Item = &MarketSnapshot> {
        self.market_snapshot_map(period).values()
    }

    pub fn processed_count(&self) -> usize {
        self.processed_events.len()
    }

    fn market_snapshot_map(&self, period: SnapshotPeriod) -> &BTreeMap<String, MarketSnapshot> {
        match period {
            SnapshotPeriod::Daily => &self.daily_market_snapshots,
            SnapshotPeriod::Hourly => &self.hourly_market_snapshots,
        }
    }

    fn usage_snapshot_map(&self, period: SnapshotPeriod) -> &BTreeMap<String, UsageSnapshot> {
        match period {
            SnapshotPeriod::Daily => &self.daily_usage_snapshots,
            SnapshotPeriod::Hourly => &self.hourly_usage_snapshots,
        }
    }
}

impl Store for InMemoryStore {
    fn token(&self, id: &AssetId) -> Option<Token> {
        self.tokens.get(id.as_str()).cloned()
    }

    fn save_token(&mut self, token: Token) {
        self.tokens.insert(token.id.to_string(), token);
    }

    fn market(&self, id: &AssetId) -> Option<Market> {
        self.markets.get(id.as_str()).cloned()
    }

    fn save_market(&mut self, market: Market) {
        self.markets.insert(market.id.to_string(), market);
    }

    fn market_ids(&self) -> Vec<AssetId> {
        self.markets.keys().map(AssetId::new).collect()
    }

    fn account(&self, id: &AccountId) -> Option<Account> {
        self.accounts.get(id.as_str()).cloned()
    }

    fn save_account(&mut self, account: Account) {
        self.accounts.insert(account.id.to_string(), account);
    }

    fn position_counter(&self, id: &str) -> Option<PositionCounter> {
        self.position_counters.get(id).cloned()
    }

    fn save_position_counter(&mut self, counter: PositionCounter) {
        self.position_counters.insert(counter.id.clone(), counter);
    }

    fn position(&self, id: &str) -> Option<Position> {
        self.positions.get(id).cloned()
    }

    fn save_position(&mut self, position: Position) {
        self.positions.insert(position.id.clone(), position);
    }

    fn save_position_snapshot(&mut self, snapshot: PositionSnapshot) {
        self.position_snapshots.insert(snapshot.id.clone(), snapshot);
    }

    fn protocol(&self) -> Option<Protocol> {
        self.protocol.clone()
    }

    fn save_protocol(&mut self, protocol: Protocol) {
        self.protocol = Some(protocol);
    }

    fn interest_rate(&self, id: &str) -> Option<InterestRate> {
        self.interest_rates.get(id).cloned()
    }

    fn save_interest_rate(&mut self, rate: InterestRate) {
        self.interest_rates.insert(rate.id.clone(), rate);
    }

    fn market_snapshot(&self, period: SnapshotPeriod, id: &str) -> Option<MarketSnapshot> {
        self.market_snapshot_map(period).get(id).cloned()
    }

    fn save_market_snapshot(&mut self, snapshot: MarketSnapshot) {
        let map = match snapshot.period {
            SnapshotPeriod::Daily => &mut self.daily_market_snapshots,
            SnapshotPeriod::Hourly => &mut self.hourly_market_snapshots,
        };
        map.insert(snapshot.id.clone(), snapshot);
    }

    fn usage_snapshot(&self, period: SnapshotPeriod, id: &str) -> Option<UsageSnapshot> {
        self.usage_snapshot_map(period).get(id).cloned()
    }

    fn save_usage_snapshot(&mut self, snapshot: UsageSnapshot) {
        let map = match snapshot.period {
            SnapshotPeriod::Daily => &mut self.daily_usage_snapshots,
            SnapshotPeriod::Hourly => &mut self.hourly_usage_snapshots,
        };
        map.insert(snapshot.id.clone(), snapshot);
    }

    fn financial_snapshot(&self, id: &str) -> Option<FinancialSnapshot> {
        self.financial_snapshots.get(id).cloned()
    }

    fn save_financial_snapshot(&mut self, snapshot: FinancialSnapshot) {
        self.financial_snapshots.insert(snapshot.id.clone(), snapshot);
    }

    fn has_record(&self, id: &str) -> bool {
        self.transactions.contains_key(id) || self.liquidations.contains_key(id)
    }

    fn save_transaction(&mut self, record: TransactionRecord) {
        self.transactions.insert(record.id.clone(), record);
    }

    fn save_liquidation(&mut self, record: LiquidationRecord) {
        self.liquidations.insert(record.id.clone(), record);
    }

    fn mark_active_account(&mut self, key: String) -> bool {
        self.active_accounts.insert(key)
    }

    fn is_processed(&self, event_key: &str) -> bool {
        self.processed_events.contains(event_key)
    }

    fn mark_processed(&mut self, event_key: String) {
        self.processed_events.insert(event_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeMs;

    #[test]
    fn test_market_ids_sorted() {
        let mut store = InMemoryStore::new();
        for id in ["zeta", "alpha", "mid"] {
            store.save_market(Market::new(AssetId::new(id), id.into(), TimeMs::new(0), 0));
        }
        let ids: Vec<String> = store.market_ids().iter().map(|i| i.to_string()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_active_account_marked_once() {
        let mut store = InMemoryStore::new();
        assert!(store.mark_active_account("daily-alice-3".into()));
        assert!(!store.mark_active_account("daily-alice-3".into()));
        assert!(store.mark_active_account("hourly-alice-72".into()));
    }

    #[test]
    fn test_processed_ledger() {
        let mut store = InMemoryStore::new();
        assert!(!store.is_processed("0xabc-1"));
        store.mark_processed("0xabc-1".into());
        assert!(store.is_processed("0xabc-1"));
        assert_eq!(store.processed_count(), 1);
    }
}
