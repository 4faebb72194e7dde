use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::types::{Draw, MAX_NUMBER, MIN_NUMBER};

/// Bonus numbers are not counted; only the six main numbers of each draw are.
pub const COUNT_BONUS: bool = false;

/// How many numbers at each end of the ranking are labelled hot or cold.
pub const HEAT_BAND: usize = 15;

const SLOTS: usize = MAX_NUMBER as usize;

/// Occurrence counts over the whole 1..=45 domain. Numbers never drawn count 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u32; SLOTS],
    draws: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Heat {
    Hot,
    Neutral,
    Cold,
}

#[derive(Debug, Clone, Serialize)]
pub struct NumberFrequency {
    pub number: u8,
    pub count: u32,
    pub heat: Heat,
}

impl FrequencyTable {
    pub fn empty() -> Self {
        FrequencyTable {
            counts: [0; SLOTS],
            draws: 0,
        }
    }

    /// Builds a table from explicit counts over `draws` draws, index 0 holding number 1.
    pub fn from_counts(counts: [u32; SLOTS], draws: usize) -> Self {
        FrequencyTable { counts, draws }
    }

    pub fn count(&self, number: u8) -> u32 {
        match number {
            MIN_NUMBER..=MAX_NUMBER => self.counts[(number - 1) as usize],
            _ => 0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &count)| (i as u8 + MIN_NUMBER, count))
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    pub fn draws_analyzed(&self) -> usize {
        self.draws
    }

    /// Highest count first, ties by ascending number.
    pub fn ranked_desc(&self) -> Vec<u8> {
        let mut numbers: Vec<u8> = (MIN_NUMBER..=MAX_NUMBER).collect();
        numbers.sort_by(|&a, &b| self.count(b).cmp(&self.count(a)).then(a.cmp(&b)));
        numbers
    }

    /// Lowest count first, ties by ascending number.
    pub fn ranked_asc(&self) -> Vec<u8> {
        let mut numbers: Vec<u8> = (MIN_NUMBER..=MAX_NUMBER).collect();
        numbers.sort_by(|&a, &b| self.count(a).cmp(&self.count(b)).then(a.cmp(&b)));
        numbers
    }

    pub fn heat(&self, number: u8) -> Heat {
        let ranked = self.ranked_desc();
        match ranked.iter().position(|&n| n == number) {
            Some(pos) if pos < HEAT_BAND => Heat::Hot,
            Some(pos) if pos >= ranked.len() - HEAT_BAND => Heat::Cold,
            _ => Heat::Neutral,
        }
    }

    /// Every number with its count and label, in `ranked_desc` order.
    pub fn labelled(&self) -> Vec<NumberFrequency> {
        let ranked = self.ranked_desc();
        let len = ranked.len();
        ranked
            .into_iter()
            .enumerate()
            .map(|(pos, number)| NumberFrequency {
                number,
                count: self.count(number),
                heat: if pos < HEAT_BAND {
                    Heat::Hot
                } else if pos >= len - HEAT_BAND {
                    Heat::Cold
                } else {
                    Heat::Neutral
                },
            })
            .collect()
    }
}

/// Serialized as `{"1": n, ..., "45": n}`, numeric key order.
impl Serialize for FrequencyTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SLOTS))?;
        for (number, count) in self.iter() {
            map.serialize_entry(&number.to_string(), &count)?;
        }
        map.end()
    }
}

/// Counts main-number occurrences. Any malformed draw aborts the whole computation.
pub fn compute_frequencies(draws: &[Draw]) -> Result<FrequencyTable> {
    let mut table = FrequencyTable::empty();

    for draw in draws {
        draw.validate()?;
        for &n in &draw.numbers {
            table.counts[(n - 1) as usize] += 1;
        }
        if COUNT_BONUS {
            table.counts[(draw.bonus - 1) as usize] += 1;
        }
        table.draws += 1;
    }

    Ok(table)
}
