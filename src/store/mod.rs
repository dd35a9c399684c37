//! Entity repository consumed by the engine.
//!
//! Accessors return owned copies; callers mutate and write back with the
//! matching `save_*` call. The engine is the only writer.

use crate::domain::{
    Account, AccountId, AssetId, FinancialSnapshot, InterestRate, LiquidationRecord, Market,
    MarketSnapshot, Position, PositionCounter, PositionSnapshot, Protocol, SnapshotPeriod, Token,
    TransactionRecord, UsageSnapshot,
};

pub mod memory;

pub use memory::InMemoryStore;

pub trait Store {
    fn token(&self, id: &AssetId) -> Option<Token>;
    fn save_token(&mut self, token: Token);

    fn market(&self, id: &AssetId) -> Option<Market>;
    fn save_market(&mut self, market: Market);
    /// All market ids in ascending order.
    fn market_ids(&self) -> Vec<AssetId>;

    fn account(&self, id: &AccountId) -> Option<Account>;
    fn save_account(&mut self, account: Account);

    fn position_counter(&self, id: &str) -> Option<PositionCounter>;
    fn save_position_counter(&mut self, counter: PositionCounter);
    fn position(&self, id: &str) -> Option<Position>;
    fn save_position(&mut self, position: Position);
    fn save_position_snapshot(&mut self, snapshot: PositionSnapshot);

    fn protocol(&self) -> Option<Protocol>;
    fn save_protocol(&mut self, protocol: Protocol);

    fn interest_rate(&self, id: &str) -> Option<InterestRate>;
    fn save_interest_rate(&mut self, rate: InterestRate);

    fn market_snapshot(&self, period: SnapshotPeriod, id: &str) -> Option<MarketSnapshot>;
    fn save_market_snapshot(&mut self, snapshot: MarketSnapshot);
    fn usage_snapshot(&self, period: SnapshotPeriod, id: &str) -> Option<UsageSnapshot>;
    fn save_usage_snapshot(&mut self, snapshot: UsageSnapshot);
    fn financial_snapshot(&self, id: &str) -> Option<FinancialSnapshot>;
    fn save_financial_snapshot(&mut self, snapshot: FinancialSnapshot);

    /// True if a transaction or liquidation record with this id exists.
    fn has_record(&self, id: &str) -> bool;
    fn save_transaction(&mut self, record: TransactionRecord);
    fn save_liquidation(&mut self, record: LiquidationRecord);

    /// Mark `key` as an active account for its bucket; true the first time.
    fn mark_active_account(&mut self, key: String) -> bool;

    fn is_processed(&self, event_key: &str) -> bool;
    fn mark_processed(&mut self, event_key: String);
}
