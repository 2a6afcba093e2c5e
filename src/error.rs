use thiserror::Error;

#[derive(Debug, Error)]
pub enum JotError {
    #[error("note {0} not found")]
    NoteNotFound(i64),

    #[error("note store is closed")]
    StoreClosed,

    #[error("cannot locate a home directory (set JOTTER_HOME or pass --home)")]
    NoHomeDirectory,

    #[error("cannot read note list: {0}")]
    Snapshot(String),

    #[error("logging: {0}")]
    Logging(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
}

impl JotError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoteNotFound(_) => "note_not_found",
            Self::StoreClosed => "store_closed",
            Self::NoHomeDirectory => "no_home_directory",
            Self::Snapshot(_) => "snapshot_failed",
            Self::Logging(_) => "logging_error",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::Db(_) => "db_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, JotError>;
