use thiserror::Error;

/// Startup configuration problems. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("unsupported backend url scheme in {0}; expected postgres:// or http(s)://")]
    UnsupportedScheme(String),
}

/// Any read or write failure against the backend.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("malformed backend response: {0}")]
    Decode(String),

    #[error("{0} not found")]
    NotFound(String),
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Decode(err.to_string())
    }
}

/// A submission rejected before any backend call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(i64),

    #[error("unknown feedback kind: {0}")]
    UnknownKind(String),

    #[error("survey answers must look like QUESTION=VALUE, got {0:?}")]
    MalformedAnswer(String),

    #[error("no professor matches {0:?}")]
    UnknownProfessor(String),
}

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}
