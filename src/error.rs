// src/error.rs
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LeagueError>;

/// Errors raised at the fallible edges of the crate.
///
/// Scoring, sanitizing, merging and response parsing never fail; malformed
/// input degrades to defaults there. These variants cover file I/O,
/// configuration and explicit state transitions.
#[derive(Error, Debug)]
pub enum LeagueError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Prediction {0} is already resolved")]
    AlreadyResolved(String),
}

impl From<toml::de::Error> for LeagueError {
    fn from(e: toml::de::Error) -> Self {
        LeagueError::Config(e.to_string())
    }
}
