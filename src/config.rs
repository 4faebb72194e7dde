use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;
use std::env;
use std::time::Duration;

use crate::api::DEFAULT_API_URL;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub api_url: String,
    /// Local zone used to bucket selections into weeks.
    pub utc_offset: FixedOffset,
    /// Pause between draw fetches during ingestion.
    pub ingest_pause: Duration,
    /// Upper bound on each upstream HTTP request.
    pub http_timeout: Duration,
}

pub fn load() -> Result<Config> {
    let database_url = env::var("LOTTO_DB_PATH").unwrap_or_else(|_| "data/lotto.db".to_string());
    let api_url = env::var("LOTTO_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

    let offset_hours: i32 = match env::var("LOTTO_UTC_OFFSET_HOURS") {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("LOTTO_UTC_OFFSET_HOURS is not an integer: {}", raw))?,
        Err(_) => 9,
    };
    let utc_offset = FixedOffset::east_opt(offset_hours * 3600)
        .ok_or_else(|| anyhow!("LOTTO_UTC_OFFSET_HOURS out of range: {}", offset_hours))?;

    let pause_ms: u64 = match env::var("LOTTO_INGEST_PAUSE_MS") {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("LOTTO_INGEST_PAUSE_MS is not an integer: {}", raw))?,
        Err(_) => 1000,
    };

    let timeout_ms: u64 = match env::var("LOTTO_HTTP_TIMEOUT_MS") {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("LOTTO_HTTP_TIMEOUT_MS is not an integer: {}", raw))?,
        Err(_) => 10_000,
    };

    Ok(Config {
        database_url,
        api_url,
        utc_offset,
        ingest_pause: Duration::from_millis(pause_ms),
        http_timeout: Duration::from_millis(timeout_ms),
    })
}
