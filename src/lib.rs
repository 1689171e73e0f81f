// src/lib.rs
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod merge;
pub mod models;
pub mod sanitize;
pub mod scoring;
pub mod time;

pub use api::{parse_response, SearchResponse};
pub use cache::SymbolSearchCache;
pub use config::{AppConfig, CacheConfig};
pub use error::{LeagueError, Result};
pub use merge::{merge, normalize, should_replace, MergeOutcome, NormalizeOutcome};
pub use models::{
    Direction, LeagueEntry, LeagueUsers, Period, Prediction, Status, SymbolSearchMatch,
};
pub use sanitize::{is_valid_prediction, sanitize};
pub use scoring::{leaderboard, score_system_one, score_system_two, ScoringSystem, Standing};
