use anyhow::Result;
use lotto_mcp::{AnalyticsUseCase, IngestionUseCase, MCPHandler, stdio};
use lotto_stats::{LottoService, SqliteStore, config};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Serving lotto stats from {}", config.database_url);

    let store = Arc::new(SqliteStore::open(&config.database_url)?);

    let analytics_use_case = {
        AnalyticsUseCase::new(LottoService::new(Arc::clone(&store), config.utc_offset))
    };

    let ingestion_use_case = IngestionUseCase::new(
        Arc::clone(&store),
        config.api_url.clone(),
        config.ingest_pause,
        config.http_timeout,
    )?;

    let handler = MCPHandler::new(Arc::new(analytics_use_case), Arc::new(ingestion_use_case));

    let (reader, writer) = stdio();

    handler.serve(reader, writer).await.inspect_err(|e| {
        tracing::error!("serving error: {:?}", e);
    })?;

    Ok(())
}
