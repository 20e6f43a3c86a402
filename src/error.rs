use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Price Source Errors
    // The three fetch variants are caught at the fetcher boundary and turned
    // into "no candidate from this source"; they never cross a chain.
    #[error("fetch timed out after {0:?}")]
    FetchTimeout(Duration),

    #[error("network error: {0}")]
    FetchNetworkError(String),

    #[error("parse error: {0}")]
    FetchParseError(String),

    #[error("all {chain} sources exhausted")]
    AllSourcesExhausted { chain: &'static str },

    // Persistence Errors
    #[error("persistence error: {0}")]
    PersistenceError(String),

    // Auth / API Errors
    #[error("authentication error: {0}")]
    AuthenticationError(String),

    #[error("an account with this email already exists")]
    EmailTaken,

    #[error("not found")]
    NotFound,

    #[error("validation error: {0}")]
    Validation(String),

    // System Errors
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("background task error: {0}")]
    TaskError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::PersistenceError(e.to_string())
    }
}
