//! One-shot replay of an event log into a JSON state dump.

use crate::config::Config;
use crate::datasource::{JsonlEventSource, StaticOracle};
use crate::engine::{EngineStats, LedgerEngine};
use crate::error::AppError;
use crate::orchestration::{IngestionResult, Ingestor};
use crate::store::InMemoryStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub generated_at: DateTime<Utc>,
    pub ingestion: IngestionResult,
    pub stats: EngineStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateDump<'a> {
    #[serde(flatten)]
    report: &'a ReplayReport,
    state: &'a InMemoryStore,
}

/// Build the collaborators named by `config`, replay the log and write the dump.
pub async fn replay(config: &Config) -> Result<ReplayReport, AppError> {
    let mut oracle = StaticOracle::new();
    if let Some(path) = &config.prices_path {
        oracle = oracle.load_prices(path)?;
    }
    if let Some(path) = &config.tokens_path {
        oracle = oracle.load_tokens(path)?;
    }
    let oracle = Arc::new(oracle);

    let source = JsonlEventSource::open(&config.events_path).await?;
    let ingestor = Ingestor::new(Arc::new(source), config.batch_size);
    let mut engine = LedgerEngine::new(
        InMemoryStore::new(),
        config.protocol.clone(),
        oracle.clone(),
        oracle,
    );

    let ingestion = ingestor.run(&mut engine).await?;
    let report = ReplayReport {
        generated_at: Utc::now(),
        ingestion,
        stats: engine.stats(),
    };

    let dump = StateDump {
        report: &report,
        state: engine.store(),
    };
    let json = serde_json::to_vec_pretty(&dump)?;
    tokio::fs::write(&config.output_path, json).await?;
    info!(path = %config.output_path, "state written");
    Ok(report)
}
