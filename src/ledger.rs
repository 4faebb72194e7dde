use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

use crate::error::{LottoError, Result};
use crate::store::SelectionStore;
use crate::types::{NewSelection, SelectionRecord, Strategy, validate_numbers};
use crate::week::WeekKey;

#[derive(Debug, Clone, Serialize)]
pub struct Recorded {
    pub accepted: SelectionRecord,
    pub participant_total: u64,
}

/// Validates and appends selections to an injected store. There is no update or delete.
pub struct Ledger<'a, S: SelectionStore + ?Sized> {
    store: &'a S,
    offset: FixedOffset,
}

impl<'a, S: SelectionStore + ?Sized> Ledger<'a, S> {
    pub fn new(store: &'a S, offset: FixedOffset) -> Self {
        Ledger { store, offset }
    }

    pub fn record(&self, participant_id: &str, numbers: &[u8], strategy: &str) -> Result<Recorded> {
        self.record_at(participant_id, numbers, strategy, Utc::now())
    }

    pub fn record_at(
        &self,
        participant_id: &str,
        numbers: &[u8],
        strategy: &str,
        at: DateTime<Utc>,
    ) -> Result<Recorded> {
        let participant_id = participant_id.trim();
        if participant_id.is_empty() {
            return Err(LottoError::InvalidSelection(
                "participant id must not be blank".to_string(),
            ));
        }
        let numbers = validate_numbers(numbers)?;
        let strategy: Strategy = strategy
            .parse()
            .map_err(|_| LottoError::InvalidSelection(format!("unknown strategy {}", strategy)))?;

        let week = WeekKey::from_datetime(at, self.offset);
        let (accepted, participant_total) = self.store.append(NewSelection {
            participant_id: participant_id.to_string(),
            numbers,
            strategy,
            created_at: at,
            week,
        })?;

        info!(
            "Recorded {} selection {:?} for {} ({} so far) in {}",
            strategy, numbers, participant_id, participant_total, week
        );
        Ok(Recorded {
            accepted,
            participant_total,
        })
    }

    pub fn selections_for_week(&self, week: WeekKey) -> Result<Vec<SelectionRecord>> {
        self.store.selections_for_week(week)
    }

    pub fn count_for_week(&self, week: WeekKey) -> Result<usize> {
        Ok(self.selections_for_week(week)?.len())
    }

    pub fn unique_participants_for_week(&self, week: WeekKey) -> Result<usize> {
        Ok(unique_participants(&self.selections_for_week(week)?))
    }

    pub fn weeks(&self) -> Result<Vec<WeekKey>> {
        self.store.weeks()
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

pub fn unique_participants(selections: &[SelectionRecord]) -> usize {
    selections
        .iter()
        .map(|s| s.participant_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqliteStore;
    use chrono::TimeZone;

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_record_returns_running_total() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ledger = Ledger::new(&store, kst());

        let first = ledger
            .record_at("alice", &[1, 2, 3, 4, 5, 6], "top20", at(13, 3))
            .unwrap();
        assert_eq!(first.participant_total, 1);
        assert_eq!(first.accepted.strategy, Strategy::Top20);
        assert_eq!(first.accepted.week.to_string(), "2024-W07");

        let second = ledger
            .record_at("alice", &[7, 8, 9, 10, 11, 12], "bottom20", at(14, 3))
            .unwrap();
        assert_eq!(second.participant_total, 2);
        assert!(second.accepted.id > first.accepted.id);
    }

    #[test]
    fn test_rejections_store_nothing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ledger = Ledger::new(&store, kst());
        let when = at(13, 3);

        let bad_inputs: [(&str, &[u8], &str); 6] = [
            ("alice", &[1, 2, 3, 4, 5], "top20"),
            ("alice", &[1, 2, 3, 4, 5, 6, 7], "top20"),
            ("alice", &[1, 2, 3, 4, 5, 5], "top20"),
            ("alice", &[0, 2, 3, 4, 5, 6], "top20"),
            ("alice", &[1, 2, 3, 4, 5, 6], "random"),
            ("   ", &[1, 2, 3, 4, 5, 6], "top20"),
        ];
        for (participant, numbers, strategy) in bad_inputs {
            assert!(matches!(
                ledger.record_at(participant, numbers, strategy, when),
                Err(LottoError::InvalidSelection(_))
            ));
        }

        let week = WeekKey::from_datetime(when, kst());
        assert_eq!(ledger.count_for_week(week).unwrap(), 0);
        assert!(ledger.weeks().unwrap().is_empty());
    }

    #[test]
    fn test_week_counts() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ledger = Ledger::new(&store, kst());

        ledger.record_at("alice", &[1, 2, 3, 4, 5, 6], "top20", at(13, 3)).unwrap();
        ledger.record_at("alice", &[1, 2, 3, 4, 5, 7], "top20", at(13, 4)).unwrap();
        ledger.record_at("bob", &[1, 2, 3, 4, 5, 8], "bottom20", at(15, 4)).unwrap();
        // Sunday 18:00 UTC is Monday in UTC+9, so this lands in week 8.
        ledger.record_at("carol", &[1, 2, 3, 4, 5, 9], "top20", at(18, 18)).unwrap();

        let week7 = WeekKey::new(2024, 7).unwrap();
        assert_eq!(ledger.count_for_week(week7).unwrap(), 3);
        assert_eq!(ledger.unique_participants_for_week(week7).unwrap(), 2);

        let week8 = WeekKey::new(2024, 8).unwrap();
        assert_eq!(ledger.count_for_week(week8).unwrap(), 1);
        assert_eq!(ledger.weeks().unwrap(), vec![week7, week8]);
    }
}
