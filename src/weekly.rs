use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::ledger::{Ledger, unique_participants};
use crate::store::{DrawRepository, SelectionStore};
use crate::types::{Draw, SelectionRecord, Strategy};
use crate::week::WeekKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PrizeTier {
    #[serde(rename = "1st")]
    First,
    #[serde(rename = "2nd")]
    Second,
    #[serde(rename = "3rd")]
    Third,
    #[serde(rename = "4th")]
    Fourth,
    #[serde(rename = "5th")]
    Fifth,
}

impl PrizeTier {
    pub const ALL: [PrizeTier; 5] = [
        PrizeTier::First,
        PrizeTier::Second,
        PrizeTier::Third,
        PrizeTier::Fourth,
        PrizeTier::Fifth,
    ];

    /// Standard 6/45 table, evaluated top-down. Two or fewer matches win nothing.
    pub fn classify(matched: usize, bonus_matched: bool) -> Option<PrizeTier> {
        match (matched, bonus_matched) {
            (6, _) => Some(PrizeTier::First),
            (5, true) => Some(PrizeTier::Second),
            (5, false) => Some(PrizeTier::Third),
            (4, _) => Some(PrizeTier::Fourth),
            (3, _) => Some(PrizeTier::Fifth),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PrizeTier::First => "1st",
            PrizeTier::Second => "2nd",
            PrizeTier::Third => "3rd",
            PrizeTier::Fourth => "4th",
            PrizeTier::Fifth => "5th",
        }
    }
}

/// A week only ever moves from `Open` to `DrawPublished`, because the state is read
/// off the append-only draw history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeekState {
    Open,
    DrawPublished,
}

/// Monday to Sunday of a week, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl From<WeekKey> for WeekPeriod {
    fn from(week: WeekKey) -> Self {
        WeekPeriod {
            start: week.monday(),
            end: week.sunday(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionOutcome {
    pub selection_id: i64,
    pub numbers: [u8; 6],
    pub strategy: Strategy,
    pub matched: usize,
    pub bonus_matched: bool,
    pub tier: Option<PrizeTier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklySummary {
    pub week: WeekKey,
    pub period: WeekPeriod,
    pub state: WeekState,
    pub total_selections: usize,
    pub unique_participants: usize,
    pub has_results: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw: Option<Draw>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<BTreeMap<PrizeTier, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_prize: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<SelectionOutcome>,
}

pub fn match_selection(numbers: &[u8; 6], draw: &Draw) -> (usize, bool) {
    let matched = numbers.iter().filter(|&&n| draw.contains(n)).count();
    (matched, numbers.contains(&draw.bonus))
}

/// Pure aggregation of one week's selections against its draw, if published.
pub fn summarize(week: WeekKey, selections: &[SelectionRecord], draw: Option<Draw>) -> WeeklySummary {
    let total_selections = selections.len();
    let unique_participants = unique_participants(selections);

    let Some(draw) = draw else {
        return WeeklySummary {
            week,
            period: week.into(),
            state: WeekState::Open,
            total_selections,
            unique_participants,
            has_results: false,
            draw: None,
            summary: None,
            no_prize: None,
            outcomes: Vec::new(),
        };
    };

    let mut summary: BTreeMap<PrizeTier, usize> =
        PrizeTier::ALL.iter().map(|&tier| (tier, 0)).collect();
    let mut no_prize = 0;

    let outcomes: Vec<SelectionOutcome> = selections
        .iter()
        .map(|selection| {
            let (matched, bonus_matched) = match_selection(&selection.numbers, &draw);
            let tier = PrizeTier::classify(matched, bonus_matched);
            match tier {
                Some(tier) => *summary.entry(tier).or_insert(0) += 1,
                None => no_prize += 1,
            }
            SelectionOutcome {
                selection_id: selection.id,
                numbers: selection.numbers,
                strategy: selection.strategy,
                matched,
                bonus_matched,
                tier,
            }
        })
        .collect();

    WeeklySummary {
        week,
        period: week.into(),
        state: WeekState::DrawPublished,
        total_selections,
        unique_participants,
        has_results: true,
        draw: Some(draw),
        summary: Some(summary),
        no_prize: Some(no_prize),
        outcomes,
    }
}

pub fn weekly_stats<S, D>(week: WeekKey, ledger: &Ledger<'_, S>, draws: &D) -> Result<WeeklySummary>
where
    S: SelectionStore + ?Sized,
    D: DrawRepository + ?Sized,
{
    let selections = ledger.selections_for_week(week)?;
    let draw = draws.draw_for_week(week)?;
    Ok(summarize(week, &selections, draw))
}

/// One summary per week that has selections, oldest first.
pub fn weekly_history<S, D>(ledger: &Ledger<'_, S>, draws: &D) -> Result<Vec<WeeklySummary>>
where
    S: SelectionStore + ?Sized,
    D: DrawRepository + ?Sized,
{
    ledger
        .weeks()?
        .into_iter()
        .map(|week| weekly_stats(week, ledger, draws))
        .collect()
}
