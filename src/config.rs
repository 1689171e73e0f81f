// src/config.rs
use crate::error::{LeagueError, Result};
use log::{info, warn};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;
pub const DEFAULT_MAX_ENTRIES: usize = 50;

pub const ENV_CACHE_TTL_MS: &str = "STOCK_LEAGUE_CACHE_TTL_MS";
pub const ENV_CACHE_MAX_ENTRIES: &str = "STOCK_LEAGUE_CACHE_MAX_ENTRIES";

/// Symbol search cache settings. `max_entries = 0` disables storage.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_ms: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            ttl_ms: DEFAULT_TTL_MS,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub cache: CacheConfig,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            cache: CacheConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

fn env_override<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| LeagueError::Config(format!("{} is not a valid value: {:?}", name, raw))),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reads `path` if given and present, falling back to defaults, then
    /// applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)?;
                info!("Loaded configuration from {}", path.display());
                Self::from_toml_str(&content)?
            }
            Some(path) => {
                warn!("Config file {} not found, using defaults", path.display());
                AppConfig::default()
            }
            None => AppConfig::default(),
        };

        if let Some(ttl_ms) = env_override(ENV_CACHE_TTL_MS)? {
            config.cache.ttl_ms = ttl_ms;
        }
        if let Some(max_entries) = env_override(ENV_CACHE_MAX_ENTRIES)? {
            config.cache.max_entries = max_entries;
        }
        Ok(config)
    }
}
