use lendledger::domain::{AccountId, AssetId, SnapshotPeriod};
use lendledger::{
    Amount, Decimal, EventSource, Ingestor, InMemoryStore, JsonlEventSource, LedgerEngine,
    ProtocolConfig, StaticOracle, Store,
};
use std::io::Write;
use std::sync::Arc;

const DAY: i64 = 86_400_000;

fn log() -> String {
    let lines = [
        format!(
            r#"{{"txHash":"0xa1","logIndex":0,"blockNumber":1,"timestamp":{},"type":"assetRegistered","asset":"usdc","config":{{"reserveRatio":2000,"targetUtilization":8000,"targetUtilizationRate":"1000000000000000000000000000","maxUtilizationRate":"1000000000000000000000000000","volatilityRatio":9000}}}}"#,
            1000
        ),
        format!(
            r#"{{"txHash":"0xa2","logIndex":0,"blockNumber":2,"timestamp":{},"type":"deposit","account":"alice","asset":"usdc","amount":"1000000"}}"#,
            2000
        ),
        "not json".to_string(),
        format!(
            r#"{{"txHash":"0xa3","logIndex":0,"blockNumber":3,"timestamp":{},"type":"deposit","account":"bob","asset":"usdc","amount":"500000"}}"#,
            DAY + 1000
        ),
        format!(
            r#"{{"txHash":"0xa4","logIndex":0,"blockNumber":4,"timestamp":{},"type":"withdraw","account":"alice","asset":"usdc","amount":"250000"}}"#,
            DAY + 2000
        ),
        format!(
            r#"{{"txHash":"0xa4","logIndex":0,"blockNumber":4,"timestamp":{},"type":"withdraw","account":"alice","asset":"usdc","amount":"250000"}}"#,
            DAY + 2000
        ),
    ];
    lines.join("\n")
}

fn compress(input: &[u8]) -> Vec<u8> {
    let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
    encoder.write_all(input).unwrap();
    encoder.finish().unwrap()
}

fn engine() -> LedgerEngine<InMemoryStore> {
    let oracle = Arc::new(
        StaticOracle::new()
            .with_price("usdc", Amount::from(1u64), 0)
            .with_token("usdc", "USD Coin", "USDC", 6),
    );
    LedgerEngine::new(InMemoryStore::new(), ProtocolConfig::default(), oracle.clone(), oracle)
}

#[tokio::test]
async fn test_replay_lz4_log_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl.lz4");
    std::fs::write(&path, compress(log().as_bytes())).unwrap();

    let source = JsonlEventSource::open(&path).await.unwrap();
    assert_eq!(source.rejected(), 1);
    let ingestor = Ingestor::new(Arc::new(source), 2);
    let mut engine = engine();

    let result = ingestor.run(&mut engine).await.unwrap();
    assert_eq!(result.events_fetched, 5);
    assert_eq!(result.applied, 4);
    assert_eq!(result.duplicates, 1);
    assert_eq!(result.rejected, 1);

    let store = engine.store();
    let market = store.market(&AssetId::new("usdc")).unwrap();
    assert_eq!(market.input_token_balance, Amount::from(1_250_000u64));
    assert_eq!(market.total_deposit_balance_usd, Decimal::from_str_canonical("1.25").unwrap());

    let day0 = store.market_snapshot(SnapshotPeriod::Daily, "usdc-0").unwrap();
    assert_eq!(day0.deposit_count, 1);
    assert_eq!(day0.cumulative_deposit_usd, Decimal::from(1i64));
    let day1 = store.market_snapshot(SnapshotPeriod::Daily, "usdc-1").unwrap();
    assert_eq!(day1.deposit_count, 1);
    assert_eq!(day1.withdraw_count, 1);
    assert_eq!(day1.withdraw_usd, Decimal::from_str_canonical("0.25").unwrap());

    let financial = store.financial_snapshot("1").unwrap();
    assert_eq!(financial.daily_deposit_usd, Decimal::from_str_canonical("0.5").unwrap());
    let usage = store.usage_snapshot(SnapshotPeriod::Daily, "1").unwrap();
    assert_eq!(usage.active_users, 2);
    assert_eq!(usage.transaction_count, 2);

    let alice = store.account(&AccountId::new("alice")).unwrap();
    assert_eq!(alice.deposit_count, 1);
    assert_eq!(alice.withdraw_count, 1);
    assert_eq!(store.transactions().count(), 3);
}

#[tokio::test]
async fn test_plain_log_matches_compressed_log() {
    let dir = tempfile::tempdir().unwrap();
    let plain = dir.path().join("events.jsonl");
    let packed = dir.path().join("events.jsonl.lz4");
    std::fs::write(&plain, log()).unwrap();
    std::fs::write(&packed, compress(log().as_bytes())).unwrap();

    let mut a = engine();
    let mut b = engine();
    Ingestor::new(Arc::new(JsonlEventSource::open(&plain).await.unwrap()), 100)
        .run(&mut a)
        .await
        .unwrap();
    Ingestor::new(Arc::new(JsonlEventSource::open(&packed).await.unwrap()), 1)
        .run(&mut b)
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(a.store()).unwrap(),
        serde_json::to_value(b.store()).unwrap()
    );
}
