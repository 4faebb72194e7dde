use anyhow::Result;
use lotto_stats::api::{build_client, ingest_new_draws};
use lotto_stats::{LottoService, SqliteStore, WeekKey};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn required_str<'a>(arguments: &'a HashMap<String, Value>, key: &str) -> Result<&'a str> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing {} parameter", key))
}

fn parse_numbers(value: &Value) -> Result<Vec<u8>> {
    let items = value
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("numbers must be an array of integers"))?;

    items
        .iter()
        .map(|item| {
            item.as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| anyhow::anyhow!("Invalid number in selection: {}", item))
        })
        .collect()
}

pub struct AnalyticsUseCase {
    service: LottoService,
}

impl AnalyticsUseCase {
    pub fn new(service: LottoService) -> Self {
        Self { service }
    }

    pub async fn get_history(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        let draws = self.service.get_history()?;

        Ok(json!({
            "success": true,
            "count": draws.len(),
            "draws": draws
        })
        .to_string())
    }

    pub async fn get_draw(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let draw_no = arguments
            .get("draw_no")
            .and_then(|v| v.as_u64())
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| anyhow::anyhow!("Missing draw_no parameter"))?;

        let draw = self.service.get_draw(draw_no)?;

        Ok(json!({
            "success": true,
            "draw": draw
        })
        .to_string())
    }

    pub async fn get_analysis(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        let table = self.service.get_analysis()?;

        Ok(json!({
            "success": true,
            "draws_analyzed": table.draws_analyzed(),
            "frequencies": table,
            "ranking": table.labelled()
        })
        .to_string())
    }

    pub async fn get_recommendation(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let strategy = required_str(arguments, "strategy")?;
        let recommendation = self.service.get_recommendation(strategy)?;

        Ok(json!({
            "success": true,
            "strategy": recommendation.strategy,
            "numbers": recommendation.numbers,
            "pool": recommendation.pool
        })
        .to_string())
    }

    pub async fn submit_selection(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let participant_id = required_str(arguments, "participant_id")?;
        let strategy = required_str(arguments, "strategy")?;
        let numbers = arguments
            .get("numbers")
            .ok_or_else(|| anyhow::anyhow!("Missing numbers parameter"))
            .and_then(parse_numbers)?;

        let recorded = self
            .service
            .submit_selection(participant_id, &numbers, strategy)?;

        Ok(json!({
            "success": true,
            "accepted": recorded.accepted,
            "participant_total": recorded.participant_total
        })
        .to_string())
    }

    pub async fn get_weekly_stats(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let week = match arguments.get("week") {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) => Some(raw.parse::<WeekKey>()?),
            Some(other) => {
                return Err(anyhow::anyhow!(
                    "week must be a string like 2024-W07, got {}",
                    other
                ));
            }
        };

        let summary = self.service.get_weekly_stats(week)?;

        Ok(json!({
            "success": true,
            "stats": summary
        })
        .to_string())
    }

    pub async fn get_weekly_history(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        let history = self.service.get_weekly_history()?;

        Ok(json!({
            "success": true,
            "weeks": history
        })
        .to_string())
    }
}

pub struct IngestionUseCase {
    store: Arc<SqliteStore>,
    client: reqwest::Client,
    api_url: String,
    pause: Duration,
}

impl IngestionUseCase {
    pub fn new(
        store: Arc<SqliteStore>,
        api_url: String,
        pause: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            store,
            client: build_client(timeout)?,
            api_url,
            pause,
        })
    }

    pub async fn trigger_ingestion(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        let added = ingest_new_draws(&self.store, &self.client, &self.api_url, self.pause)
            .await
            .map_err(|e| anyhow::anyhow!("Ingestion error: {}", e))?;

        Ok(json!({
            "success": true,
            "added_count": added.len(),
            "added": added,
            "latest_draw_no": self.store.latest_draw_no()?
        })
        .to_string())
    }
}
