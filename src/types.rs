use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{LottoError, Result};
use crate::week::WeekKey;

pub const MIN_NUMBER: u8 = 1;
pub const MAX_NUMBER: u8 = 45;
pub const PICK_COUNT: usize = 6;
pub const POOL_SIZE: usize = 20;

/// One official result: six main numbers plus a bonus, immutable once published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "DrawRow", try_from = "DrawRow")]
pub struct Draw {
    pub draw_no: u32,
    pub draw_date: NaiveDate,
    /// Kept in drawn order for display.
    pub numbers: [u8; 6],
    pub bonus: u8,
}

impl Draw {
    pub fn new(draw_no: u32, draw_date: NaiveDate, numbers: [u8; 6], bonus: u8) -> Result<Self> {
        let draw = Draw {
            draw_no,
            draw_date,
            numbers,
            bonus,
        };
        draw.validate()?;
        Ok(draw)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| LottoError::InvalidDraw {
            draw_no: self.draw_no,
            reason,
        };

        if self.draw_no == 0 {
            return Err(invalid("draw number must be positive".to_string()));
        }
        for &n in self.numbers.iter().chain(std::iter::once(&self.bonus)) {
            if !in_range(n) {
                return Err(invalid(format!(
                    "number {} outside {}-{}",
                    n, MIN_NUMBER, MAX_NUMBER
                )));
            }
        }
        if let Some(dup) = first_duplicate(&self.numbers) {
            return Err(invalid(format!("duplicate main number {}", dup)));
        }
        if self.numbers.contains(&self.bonus) {
            return Err(invalid(format!(
                "bonus {} repeats a main number",
                self.bonus
            )));
        }
        Ok(())
    }

    pub fn contains(&self, number: u8) -> bool {
        self.numbers.contains(&number)
    }
}

/// Flat wire shape of a draw (`num1..num6`), as the history view consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawRow {
    pub draw_no: u32,
    pub draw_date: NaiveDate,
    pub num1: u8,
    pub num2: u8,
    pub num3: u8,
    pub num4: u8,
    pub num5: u8,
    pub num6: u8,
    pub bonus: u8,
}

impl From<Draw> for DrawRow {
    fn from(draw: Draw) -> Self {
        let [num1, num2, num3, num4, num5, num6] = draw.numbers;
        DrawRow {
            draw_no: draw.draw_no,
            draw_date: draw.draw_date,
            num1,
            num2,
            num3,
            num4,
            num5,
            num6,
            bonus: draw.bonus,
        }
    }
}

impl TryFrom<DrawRow> for Draw {
    type Error = LottoError;

    fn try_from(row: DrawRow) -> Result<Self> {
        Draw::new(
            row.draw_no,
            row.draw_date,
            [row.num1, row.num2, row.num3, row.num4, row.num5, row.num6],
            row.bonus,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Top20,
    Bottom20,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::Top20, Strategy::Bottom20];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Top20 => "top20",
            Strategy::Bottom20 => "bottom20",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = LottoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "top20" => Ok(Strategy::Top20),
            "bottom20" => Ok(Strategy::Bottom20),
            other => Err(LottoError::UnknownStrategy(other.to_string())),
        }
    }
}

/// An accepted selection as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub id: i64,
    pub participant_id: String,
    pub numbers: [u8; 6],
    pub strategy: Strategy,
    pub created_at: DateTime<Utc>,
    pub week: WeekKey,
}

/// A selection that passed validation but has no id yet.
#[derive(Debug, Clone)]
pub struct NewSelection {
    pub participant_id: String,
    pub numbers: [u8; 6],
    pub strategy: Strategy,
    pub created_at: DateTime<Utc>,
    pub week: WeekKey,
}

/// Checks a user supplied pick: exactly six distinct numbers in 1..=45.
pub fn validate_numbers(numbers: &[u8]) -> Result<[u8; 6]> {
    let picked: [u8; 6] = numbers.try_into().map_err(|_| {
        LottoError::InvalidSelection(format!(
            "expected {} numbers, got {}",
            PICK_COUNT,
            numbers.len()
        ))
    })?;

    if let Some(&n) = picked.iter().find(|&&n| !in_range(n)) {
        return Err(LottoError::InvalidSelection(format!(
            "number {} outside {}-{}",
            n, MIN_NUMBER, MAX_NUMBER
        )));
    }
    if let Some(dup) = first_duplicate(&picked) {
        return Err(LottoError::InvalidSelection(format!(
            "duplicate number {}",
            dup
        )));
    }
    Ok(picked)
}

fn in_range(n: u8) -> bool {
    (MIN_NUMBER..=MAX_NUMBER).contains(&n)
}

fn first_duplicate(numbers: &[u8]) -> Option<u8> {
    let mut seen = [false; MAX_NUMBER as usize + 1];
    for &n in numbers {
        let slot = &mut seen[n as usize];
        if *slot {
            return Some(n);
        }
        *slot = true;
    }
    None
}

/// Response body of the official `getLottoNumber` endpoint.
#[derive(Deserialize, Debug)]
pub struct LottoNumberResponse {
    #[serde(rename = "returnValue")]
    pub return_value: String,
    #[serde(rename = "drwNo")]
    pub draw_no: Option<u32>,
    #[serde(rename = "drwNoDate")]
    pub draw_date: Option<String>,
    #[serde(rename = "drwtNo1")]
    pub num1: Option<u8>,
    #[serde(rename = "drwtNo2")]
    pub num2: Option<u8>,
    #[serde(rename = "drwtNo3")]
    pub num3: Option<u8>,
    #[serde(rename = "drwtNo4")]
    pub num4: Option<u8>,
    #[serde(rename = "drwtNo5")]
    pub num5: Option<u8>,
    #[serde(rename = "drwtNo6")]
    pub num6: Option<u8>,
    #[serde(rename = "bnusNo")]
    pub bonus: Option<u8>,
}
