use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected user input, e.g. a grade outside 0..=5. Nothing is persisted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid card {id}: {reason}")]
    InvalidCard { id: i64, reason: String },

    #[error("Invalid note {id}: {reason}")]
    InvalidNote { id: i64, reason: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn deck_not_found(id: i64) -> Self {
        Error::NotFound { kind: "Deck", id }
    }

    pub fn card_not_found(id: i64) -> Self {
        Error::NotFound { kind: "Card", id }
    }

    pub fn notebook_not_found(id: i64) -> Self {
        Error::NotFound { kind: "Notebook", id }
    }

    pub fn note_not_found(id: i64) -> Self {
        Error::NotFound { kind: "Note", id }
    }
}
