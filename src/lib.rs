pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod frequency;
pub mod ledger;
pub mod recommend;
pub mod service;
pub mod store;
pub mod types;
pub mod week;
pub mod weekly;

pub use database::SqliteStore;
pub use error::{LottoError, Result};
pub use frequency::{FrequencyTable, compute_frequencies};
pub use ledger::{Ledger, Recorded};
pub use recommend::recommend;
pub use service::{LottoService, Recommendation};
pub use store::{DrawRepository, SelectionStore};
pub use types::{Draw, SelectionRecord, Strategy};
pub use week::WeekKey;
pub use weekly::{PrizeTier, WeekPeriod, WeekState, WeeklySummary};
