use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{LottoError, Result};

/// ISO-8601 (year, week) bucket. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct WeekKey {
    year: i32,
    week: u32,
}

impl WeekKey {
    pub fn new(year: i32, week: u32) -> Result<Self> {
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
            .map(|_| WeekKey { year, week })
            .ok_or_else(|| LottoError::InvalidWeek(format!("{}-W{:02}", year, week)))
    }

    pub fn from_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        WeekKey {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// Buckets a timestamp by its calendar date in `offset`.
    pub fn from_datetime(at: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self::from_date(at.with_timezone(&offset).date_naive())
    }

    pub fn current(offset: FixedOffset) -> Self {
        Self::from_datetime(Utc::now(), offset)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    pub fn monday(&self) -> NaiveDate {
        // Construction guarantees the week exists.
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon).unwrap_or_default()
    }

    pub fn sunday(&self) -> NaiveDate {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Sun).unwrap_or_default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::from_date(date) == *self
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

impl FromStr for WeekKey {
    type Err = LottoError;

    /// Accepts `2024-W07`, `2024-w7` and `2024-7`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || LottoError::InvalidWeek(s.to_string());

        let (year, week) = s.trim().split_once('-').ok_or_else(invalid)?;
        let week = week.trim_start_matches(['W', 'w']);
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let week: u32 = week.parse().map_err(|_| invalid())?;
        WeekKey::new(year, week)
    }
}

impl From<WeekKey> for String {
    fn from(key: WeekKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for WeekKey {
    type Error = LottoError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_and_display() {
        let key: WeekKey = "2024-W07".parse().unwrap();
        assert_eq!((key.year(), key.week()), (2024, 7));
        assert_eq!(key.to_string(), "2024-W07");
        assert_eq!("2024-7".parse::<WeekKey>().unwrap(), key);
        assert!("2024-W00".parse::<WeekKey>().is_err());
        assert!("2023-W53".parse::<WeekKey>().is_err());
        assert!("2020-W53".parse::<WeekKey>().is_ok());
        assert!("garbage".parse::<WeekKey>().is_err());
    }

    #[test]
    fn test_iso_year_boundary() {
        // 2024-12-30 is the Monday of ISO week 2025-W01.
        let date = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        assert_eq!(WeekKey::from_date(date).to_string(), "2025-W01");
    }

    #[test]
    fn test_offset_shifts_bucket() {
        // Sunday 20:00 UTC is already Monday morning in UTC+9.
        let at = Utc.with_ymd_and_hms(2024, 2, 18, 20, 0, 0).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        let kst = FixedOffset::east_opt(9 * 3600).unwrap();
        assert_eq!(WeekKey::from_datetime(at, utc).to_string(), "2024-W07");
        assert_eq!(WeekKey::from_datetime(at, kst).to_string(), "2024-W08");
    }

    #[test]
    fn test_week_bounds_and_order() {
        let key = WeekKey::new(2024, 7).unwrap();
        assert_eq!(key.monday(), NaiveDate::from_ymd_opt(2024, 2, 12).unwrap());
        assert_eq!(key.sunday(), NaiveDate::from_ymd_opt(2024, 2, 18).unwrap());
        assert!(key.contains(NaiveDate::from_ymd_opt(2024, 2, 17).unwrap()));
        assert!(WeekKey::new(2023, 52).unwrap() < WeekKey::new(2024, 1).unwrap());
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"2024-W07\"");
    }
}
