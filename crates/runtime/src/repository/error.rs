//! Error types raised by event log implementations.

use thiserror::Error;

/// Errors surfaced by event log implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("event log lock was poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error at line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("log already exists: {0}")]
    LogAlreadyExists(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
