use anyhow::Result;
use lotto_stats::api::{build_client, ingest_new_draws};
use lotto_stats::frequency::Heat;
use lotto_stats::{LottoService, SqliteStore, config};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Brings the draw history up to date, then logs the current analysis and week.
#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let store = Arc::new(SqliteStore::open(&config.database_url)?);
    let client = build_client(config.http_timeout)?;

    let added = ingest_new_draws(&store, &client, &config.api_url, config.ingest_pause)
        .await
        .inspect_err(|e| tracing::error!("ingestion failed: {}", e))?;
    tracing::info!("{} draws added, {} stored", added.len(), store.count_draws()?);

    let service = LottoService::new(Arc::clone(&store), config.utc_offset);

    let analysis = service.get_analysis()?;
    let labelled = analysis.labelled();
    let hot: Vec<u8> = labelled.iter().filter(|f| f.heat == Heat::Hot).map(|f| f.number).collect();
    let cold: Vec<u8> = labelled.iter().filter(|f| f.heat == Heat::Cold).map(|f| f.number).collect();
    tracing::info!("hot numbers: {:?}", hot);
    tracing::info!("cold numbers: {:?}", cold);

    let week = service.get_weekly_stats(None)?;
    tracing::info!(
        "week {}: {} selections from {} participants, results published: {}",
        week.week,
        week.total_selections,
        week.unique_participants,
        week.has_results
    );

    Ok(())
}
