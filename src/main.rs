use anyhow::Context;
use lendledger::{replay, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("loading configuration")?;
    tracing::info!(events = %config.events_path, protocol = %config.protocol.id, "replaying event log");

    let report = replay(&config)
        .await
        .with_context(|| format!("replaying {}", config.events_path))?;

    let stats = report.stats;
    tracing::info!(
        fetched = report.ingestion.events_fetched,
        applied = stats.applied,
        duplicates = stats.duplicates,
        aborted = stats.aborted,
        rejected = report.ingestion.rejected,
        out_of_order = report.ingestion.out_of_order,
        numeric_guards = stats.numeric_guards,
        integrity_warnings = stats.integrity_warnings,
        price_unavailable = stats.price_unavailable,
        "replay finished"
    );
    Ok(())
}
