use crate::error::Result;
use crate::types::{Draw, NewSelection, SelectionRecord};
use crate::week::WeekKey;

/// Read side of the draw history. Draws are appended by ingestion and never change.
pub trait DrawRepository {
    fn all_draws(&self) -> Result<Vec<Draw>>;

    fn draw_by_no(&self, draw_no: u32) -> Result<Option<Draw>>;

    fn latest_draw(&self) -> Result<Option<Draw>>;

    /// The draw published within `week`, if any. Should two fall in one week the
    /// later draw number wins.
    fn draw_for_week(&self, week: WeekKey) -> Result<Option<Draw>>;
}

/// Append-only log of accepted selections.
pub trait SelectionStore {
    /// Stores one record atomically and returns it together with the participant's
    /// running total, counted after the append.
    fn append(&self, selection: NewSelection) -> Result<(SelectionRecord, u64)>;

    /// Records of one week ordered by `created_at`, then insertion order.
    fn selections_for_week(&self, week: WeekKey) -> Result<Vec<SelectionRecord>>;

    fn participant_total(&self, participant_id: &str) -> Result<u64>;

    /// Weeks holding at least one selection, oldest first.
    fn weeks(&self) -> Result<Vec<WeekKey>>;
}

impl DrawRepository for [Draw] {
    fn all_draws(&self) -> Result<Vec<Draw>> {
        Ok(self.to_vec())
    }

    fn draw_by_no(&self, draw_no: u32) -> Result<Option<Draw>> {
        Ok(self.iter().find(|d| d.draw_no == draw_no).cloned())
    }

    fn latest_draw(&self) -> Result<Option<Draw>> {
        Ok(self.iter().max_by_key(|d| d.draw_no).cloned())
    }

    fn draw_for_week(&self, week: WeekKey) -> Result<Option<Draw>> {
        Ok(self
            .iter()
            .filter(|d| week.contains(d.draw_date))
            .max_by_key(|d| d.draw_no)
            .cloned())
    }
}

impl DrawRepository for Vec<Draw> {
    fn all_draws(&self) -> Result<Vec<Draw>> {
        self.as_slice().all_draws()
    }

    fn draw_by_no(&self, draw_no: u32) -> Result<Option<Draw>> {
        self.as_slice().draw_by_no(draw_no)
    }

    fn latest_draw(&self) -> Result<Option<Draw>> {
        self.as_slice().latest_draw()
    }

    fn draw_for_week(&self, week: WeekKey) -> Result<Option<Draw>> {
        self.as_slice().draw_for_week(week)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn draw(no: u32, y: i32, m: u32, d: u32) -> Draw {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        Draw::new(no, date, [1, 2, 3, 4, 5, 6], 7).unwrap()
    }

    #[test]
    fn test_slice_repository() {
        let draws = vec![draw(1107, 2024, 2, 17), draw(1106, 2024, 2, 10)];
        assert_eq!(draws.latest_draw().unwrap().unwrap().draw_no, 1107);
        assert_eq!(draws.draw_by_no(1106).unwrap().unwrap().draw_no, 1106);
        assert!(draws.draw_by_no(1).unwrap().is_none());

        let week7 = WeekKey::new(2024, 7).unwrap();
        assert_eq!(draws.draw_for_week(week7).unwrap().unwrap().draw_no, 1107);
        let week9 = WeekKey::new(2024, 9).unwrap();
        assert!(draws.draw_for_week(week9).unwrap().is_none());
    }

    #[test]
    fn test_later_draw_wins_within_week() {
        let draws = [draw(1, 2024, 2, 13), draw(2, 2024, 2, 17)];
        let week7 = WeekKey::new(2024, 7).unwrap();
        assert_eq!(draws[..].draw_for_week(week7).unwrap().unwrap().draw_no, 2);
    }
}
