use chrono::FixedOffset;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;

use crate::database::SqliteStore;
use crate::error::{LottoError, Result};
use crate::frequency::{FrequencyTable, compute_frequencies};
use crate::ledger::{Ledger, Recorded};
use crate::recommend::{candidate_pool, recommend};
use crate::store::DrawRepository;
use crate::types::{Draw, PICK_COUNT, POOL_SIZE, Strategy};
use crate::week::WeekKey;
use crate::weekly::{WeeklySummary, weekly_history, weekly_stats};

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub strategy: Strategy,
    pub numbers: [u8; PICK_COUNT],
    pub pool: [u8; POOL_SIZE],
}

/// Binds one store handle to the analytics operations. Every call reads the store
/// afresh, so draws appended by ingestion show up immediately.
#[derive(Clone)]
pub struct LottoService {
    store: Arc<SqliteStore>,
    offset: FixedOffset,
}

impl LottoService {
    pub fn new(store: Arc<SqliteStore>, offset: FixedOffset) -> Self {
        Self { store, offset }
    }

    pub fn store(&self) -> &Arc<SqliteStore> {
        &self.store
    }

    fn ledger(&self) -> Ledger<'_, SqliteStore> {
        Ledger::new(self.store.as_ref(), self.offset)
    }

    pub fn get_history(&self) -> Result<Vec<Draw>> {
        self.store.all_draws()
    }

    pub fn get_draw(&self, draw_no: u32) -> Result<Draw> {
        self.store
            .draw_by_no(draw_no)?
            .ok_or_else(|| LottoError::NotFound(format!("draw {}", draw_no)))
    }

    pub fn get_analysis(&self) -> Result<FrequencyTable> {
        compute_frequencies(&self.store.all_draws()?)
    }

    pub fn get_recommendation(&self, strategy: &str) -> Result<Recommendation> {
        self.get_recommendation_with(strategy, &mut rand::rng())
    }

    pub fn get_recommendation_with<R: Rng + ?Sized>(
        &self,
        strategy: &str,
        rng: &mut R,
    ) -> Result<Recommendation> {
        let strategy: Strategy = strategy.parse()?;
        let frequencies = self.get_analysis()?;
        if frequencies.draws_analyzed() == 0 {
            return Err(LottoError::NotFound("no draw history to analyze".to_string()));
        }

        Ok(Recommendation {
            strategy,
            numbers: recommend(&frequencies, strategy, rng),
            pool: candidate_pool(&frequencies, strategy),
        })
    }

    pub fn submit_selection(
        &self,
        participant_id: &str,
        numbers: &[u8],
        strategy: &str,
    ) -> Result<Recorded> {
        self.ledger().record(participant_id, numbers, strategy)
    }

    /// Defaults to the current week in the configured offset.
    pub fn get_weekly_stats(&self, week: Option<WeekKey>) -> Result<WeeklySummary> {
        let week = week.unwrap_or_else(|| WeekKey::current(self.offset));
        weekly_stats(week, &self.ledger(), self.store.as_ref())
    }

    pub fn get_weekly_history(&self) -> Result<Vec<WeeklySummary>> {
        weekly_history(&self.ledger(), self.store.as_ref())
    }
}
