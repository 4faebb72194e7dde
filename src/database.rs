use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Params, Row};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::error::{LottoError, Result};
use crate::store::{DrawRepository, SelectionStore};
use crate::types::{Draw, NewSelection, SelectionRecord, Strategy, validate_numbers};
use crate::week::WeekKey;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS draws (
            draw_no INTEGER PRIMARY KEY,
            draw_date TEXT NOT NULL,
            num1 INTEGER NOT NULL,
            num2 INTEGER NOT NULL,
            num3 INTEGER NOT NULL,
            num4 INTEGER NOT NULL,
            num5 INTEGER NOT NULL,
            num6 INTEGER NOT NULL,
            bonus INTEGER NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS selections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            participant_id TEXT NOT NULL,
            numbers TEXT NOT NULL,
            strategy TEXT NOT NULL,
            created_at TEXT NOT NULL,
            week_key TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_selections_week ON selections (week_key, created_at)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_selections_participant ON selections (participant_id)",
        [],
    )?;

    Ok(())
}

/// Inserts a validated draw. Returns false when the draw number is already stored.
pub fn insert_draw(conn: &Connection, draw: &Draw) -> Result<bool> {
    draw.validate()?;
    let [n1, n2, n3, n4, n5, n6] = draw.numbers;
    let changed = conn.execute(
        "INSERT OR IGNORE INTO draws (draw_no, draw_date, num1, num2, num3, num4, num5, num6, bonus)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            draw.draw_no,
            draw.draw_date.format(DATE_FORMAT).to_string(),
            n1,
            n2,
            n3,
            n4,
            n5,
            n6,
            draw.bonus,
        ],
    )?;
    Ok(changed > 0)
}

pub fn get_all_draws(conn: &Connection) -> Result<Vec<Draw>> {
    query_draws(
        conn,
        "SELECT draw_no, draw_date, num1, num2, num3, num4, num5, num6, bonus
         FROM draws ORDER BY draw_no ASC",
        [],
    )
}

pub fn get_draw_by_no(conn: &Connection, draw_no: u32) -> Result<Option<Draw>> {
    let record = conn
        .query_row(
            "SELECT draw_no, draw_date, num1, num2, num3, num4, num5, num6, bonus
             FROM draws WHERE draw_no = ?1",
            [draw_no],
            DrawRecord::from_row,
        )
        .optional()?;
    record.map(DrawRecord::into_draw).transpose()
}

pub fn get_latest_draw(conn: &Connection) -> Result<Option<Draw>> {
    let record = conn
        .query_row(
            "SELECT draw_no, draw_date, num1, num2, num3, num4, num5, num6, bonus
             FROM draws ORDER BY draw_no DESC LIMIT 1",
            [],
            DrawRecord::from_row,
        )
        .optional()?;
    record.map(DrawRecord::into_draw).transpose()
}

pub fn get_draws_by_date_range(
    conn: &Connection,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<Draw>> {
    query_draws(
        conn,
        "SELECT draw_no, draw_date, num1, num2, num3, num4, num5, num6, bonus
         FROM draws
         WHERE draw_date >= ?1 AND draw_date <= ?2
         ORDER BY draw_no ASC",
        [
            start_date.format(DATE_FORMAT).to_string(),
            end_date.format(DATE_FORMAT).to_string(),
        ],
    )
}

pub fn latest_draw_no(conn: &Connection) -> Result<u32> {
    let latest: Option<u32> =
        conn.query_row("SELECT MAX(draw_no) FROM draws", [], |row| row.get(0))?;
    Ok(latest.unwrap_or(0))
}

pub fn count_draws(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM draws", [], |row| row.get(0))?;
    Ok(count as u64)
}

pub fn insert_selection(conn: &Connection, selection: &NewSelection) -> Result<i64> {
    let numbers = selection
        .numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(",");

    conn.execute(
        "INSERT INTO selections (participant_id, numbers, strategy, created_at, week_key)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            &selection.participant_id,
            &numbers,
            selection.strategy.as_str(),
            format_timestamp(selection.created_at),
            selection.week.to_string(),
        ),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn count_selections_for_participant(conn: &Connection, participant_id: &str) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM selections WHERE participant_id = ?1",
        [participant_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

pub fn get_selections_for_week(conn: &Connection, week: WeekKey) -> Result<Vec<SelectionRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, participant_id, numbers, strategy, created_at, week_key
         FROM selections
         WHERE week_key = ?1
         ORDER BY created_at ASC, id ASC",
    )?;
    let rows = stmt
        .query_map([week.to_string()], SelectionRow::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(SelectionRow::into_record).collect()
}

pub fn get_selection_weeks(conn: &Connection) -> Result<Vec<WeekKey>> {
    let mut stmt = conn.prepare("SELECT DISTINCT week_key FROM selections")?;
    let keys = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut weeks = keys
        .iter()
        .map(|k| k.parse::<WeekKey>())
        .collect::<Result<Vec<_>>>()?;
    weeks.sort();
    Ok(weeks)
}

fn query_draws<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(sql)?;
    let records = stmt
        .query_map(params, DrawRecord::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    records.into_iter().map(DrawRecord::into_draw).collect()
}

/// Fixed-width UTC timestamps so text order matches time order.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

struct DrawRecord {
    draw_no: u32,
    draw_date: String,
    numbers: [u8; 6],
    bonus: u8,
}

impl DrawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(DrawRecord {
            draw_no: row.get(0)?,
            draw_date: row.get(1)?,
            numbers: [
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
            ],
            bonus: row.get(8)?,
        })
    }

    fn into_draw(self) -> Result<Draw> {
        let draw_date = NaiveDate::parse_from_str(&self.draw_date, DATE_FORMAT).map_err(|e| {
            LottoError::InvalidDraw {
                draw_no: self.draw_no,
                reason: format!("bad draw date {:?}: {}", self.draw_date, e),
            }
        })?;
        Draw::new(self.draw_no, draw_date, self.numbers, self.bonus)
    }
}

struct SelectionRow {
    id: i64,
    participant_id: String,
    numbers: String,
    strategy: String,
    created_at: String,
    week_key: String,
}

impl SelectionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(SelectionRow {
            id: row.get(0)?,
            participant_id: row.get(1)?,
            numbers: row.get(2)?,
            strategy: row.get(3)?,
            created_at: row.get(4)?,
            week_key: row.get(5)?,
        })
    }

    fn into_record(self) -> Result<SelectionRecord> {
        let corrupt = |what: &str| {
            LottoError::InvalidSelection(format!("stored selection {} has bad {}", self.id, what))
        };

        let parsed = self
            .numbers
            .split(',')
            .map(|n| n.trim().parse::<u8>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| corrupt("numbers"))?;
        let numbers = validate_numbers(&parsed).map_err(|_| corrupt("numbers"))?;
        let strategy: Strategy = self.strategy.parse().map_err(|_| corrupt("strategy"))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|_| corrupt("timestamp"))?
            .with_timezone(&Utc);
        let week: WeekKey = self.week_key.parse().map_err(|_| corrupt("week key"))?;

        Ok(SelectionRecord {
            id: self.id,
            participant_id: self.participant_id,
            numbers,
            strategy,
            created_at,
            week,
        })
    }
}

/// SQLite-backed draw history and selection ledger behind one connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        info!("Opened lotto store at {}", path.display());
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        create_tables(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // Every write is a single statement, so a poisoned lock leaves no torn state.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_draw(&self, draw: &Draw) -> Result<bool> {
        let inserted = insert_draw(&self.lock(), draw)?;
        if inserted {
            debug!("Stored draw {}", draw.draw_no);
        }
        Ok(inserted)
    }

    pub fn latest_draw_no(&self) -> Result<u32> {
        latest_draw_no(&self.lock())
    }

    pub fn count_draws(&self) -> Result<u64> {
        count_draws(&self.lock())
    }
}

impl DrawRepository for SqliteStore {
    fn all_draws(&self) -> Result<Vec<Draw>> {
        get_all_draws(&self.lock())
    }

    fn draw_by_no(&self, draw_no: u32) -> Result<Option<Draw>> {
        get_draw_by_no(&self.lock(), draw_no)
    }

    fn latest_draw(&self) -> Result<Option<Draw>> {
        get_latest_draw(&self.lock())
    }

    fn draw_for_week(&self, week: WeekKey) -> Result<Option<Draw>> {
        let draws = get_draws_by_date_range(&self.lock(), week.monday(), week.sunday())?;
        Ok(draws.into_iter().max_by_key(|d| d.draw_no))
    }
}

impl SelectionStore for SqliteStore {
    fn append(&self, selection: NewSelection) -> Result<(SelectionRecord, u64)> {
        let conn = self.lock();
        let id = insert_selection(&conn, &selection)?;
        let total = count_selections_for_participant(&conn, &selection.participant_id)?;
        debug!(
            "Appended selection {} for {} in {}",
            id, selection.participant_id, selection.week
        );

        let record = SelectionRecord {
            id,
            participant_id: selection.participant_id,
            numbers: selection.numbers,
            strategy: selection.strategy,
            created_at: selection.created_at,
            week: selection.week,
        };
        Ok((record, total))
    }

    fn selections_for_week(&self, week: WeekKey) -> Result<Vec<SelectionRecord>> {
        get_selections_for_week(&self.lock(), week)
    }

    fn participant_total(&self, participant_id: &str) -> Result<u64> {
        count_selections_for_participant(&self.lock(), participant_id)
    }

    fn weeks(&self) -> Result<Vec<WeekKey>> {
        get_selection_weeks(&self.lock())
    }
}
