use thiserror::Error;

#[derive(Error, Debug)]
pub enum LottoError {
    #[error("Invalid draw {draw_no}: {reason}")]
    InvalidDraw { draw_no: u32, reason: String },

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Invalid week key: {0}")]
    InvalidWeek(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LottoError>;
