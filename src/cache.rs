// src/cache.rs
//! Bounded, expiring cache of symbol search results keyed by keyword.
//!
//! Not synchronized: callers sharing one across threads must serialize
//! access themselves.

use crate::config::CacheConfig;
use crate::models::SymbolSearchMatch;
use crate::time::{Clock, SystemClock};
use log::{debug, trace};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct CacheEntry {
    matches: Vec<SymbolSearchMatch>,
    expires_at: i64,
    last_access: u64,
}

pub struct SymbolSearchCache<C: Clock = SystemClock> {
    config: CacheConfig,
    clock: C,
    entries: HashMap<String, CacheEntry>,
    sequence: u64,
}

fn normalize_keyword(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}

impl SymbolSearchCache<SystemClock> {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> SymbolSearchCache<C> {
    pub fn with_clock(config: CacheConfig, clock: C) -> Self {
        SymbolSearchCache {
            config,
            clock,
            entries: HashMap::new(),
            sequence: 0,
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// Stores a copy of `matches`. Inserting past capacity evicts the single
    /// least recently used entry.
    pub fn set(&mut self, keyword: &str, matches: &[SymbolSearchMatch]) {
        let key = normalize_keyword(keyword);
        if key.is_empty() || self.config.max_entries == 0 {
            return;
        }
        let ttl = i64::try_from(self.config.ttl_ms).unwrap_or(i64::MAX);
        let entry = CacheEntry {
            matches: matches.to_vec(),
            expires_at: self.clock.now_ms().saturating_add(ttl),
            last_access: self.next_sequence(),
        };
        trace!("Caching {} match(es) for {:?}", matches.len(), key);
        self.entries.insert(key, entry);

        if self.entries.len() > self.config.max_entries {
            self.evict_least_recent();
        }
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            debug!("Evicting least recently used search {:?}", key);
            self.entries.remove(&key);
        }
    }

    /// Returns a copy of the cached matches, or `None` on a miss. Expired
    /// entries are dropped on the way.
    pub fn get(&mut self, keyword: &str) -> Option<Vec<SymbolSearchMatch>> {
        let key = normalize_keyword(keyword);
        if key.is_empty() {
            return None;
        }
        let now = self.clock.now_ms();
        let expired = self.entries.get(&key)?.expires_at <= now;
        if expired {
            debug!("Search cache entry {:?} expired", key);
            self.entries.remove(&key);
            return None;
        }
        let sequence = self.next_sequence();
        let entry = self.entries.get_mut(&key)?;
        entry.last_access = sequence;
        trace!("Search cache hit for {:?}", key);
        Some(entry.matches.clone())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drops every entry expiring at or before `now_ms`. Recency of the
    /// survivors is untouched.
    pub fn prune_expired(&mut self, now_ms: i64) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now_ms);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("Pruned {} expired search cache entries", removed);
        }
    }
}
