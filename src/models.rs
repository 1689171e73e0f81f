// src/models.rs
use crate::error::{LeagueError, Result};
use crate::scoring::{round_half_up, score_system_one, score_system_two};
use crate::time::parse_timestamp;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
}

impl Period {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "day" => Some(Period::Day),
            "week" => Some(Period::Week),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Pending,
    Resolved,
}

/// A single up/down call on a symbol over a day or a week.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub id: String,
    pub symbol: String,
    pub prediction: Direction,
    pub period: Period,
    pub made_at: String,
    pub target_date: String,
    pub open_price: Option<f64>,
    pub close_price: Option<f64>,
    pub status: Status,
    pub user: String,
}

impl Prediction {
    /// Both prices are known and the prediction is settled, so it counts
    /// toward the scores.
    pub fn is_scorable(&self) -> bool {
        self.status == Status::Resolved && self.open_price.is_some() && self.close_price.is_some()
    }

    /// Settles a pending prediction. A prediction is resolved at most once.
    pub fn resolve(&mut self, open: f64, close: f64) -> Result<()> {
        if self.status == Status::Resolved {
            return Err(LeagueError::AlreadyResolved(self.id.clone()));
        }
        if !open.is_finite() || !close.is_finite() {
            return Err(LeagueError::InvalidInput(format!(
                "prices for {} must be finite (open = {}, close = {})",
                self.symbol, open, close
            )));
        }
        self.open_price = Some(open);
        self.close_price = Some(close);
        self.status = Status::Resolved;
        Ok(())
    }

    /// Pending and past its target date.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == Status::Pending
            && parse_timestamp(&self.target_date).is_some_and(|target| target <= now)
    }
}

/// One user's predictions plus both running totals.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeagueEntry {
    pub predictions: Vec<Prediction>,
    /// System 1: +1 per correct call, -1 per wrong one.
    pub points: i64,
    /// System 2: cumulative signed percentage return, rounded.
    pub percent_points: i64,
    pub updated_at: String,
}

impl LeagueEntry {
    pub fn recompute_totals(&mut self) {
        self.points = score_system_one(&self.predictions);
        self.percent_points = round_half_up(score_system_two(&self.predictions));
    }
}

/// Username keyed collection of entries that keeps insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeagueUsers {
    entries: IndexMap<String, LeagueEntry>,
}

impl LeagueUsers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, username: &str) -> Option<&LeagueEntry> {
        self.entries.get(username)
    }

    pub fn get_mut(&mut self, username: &str) -> Option<&mut LeagueEntry> {
        self.entries.get_mut(username)
    }

    pub fn contains_key(&self, username: &str) -> bool {
        self.entries.contains_key(username)
    }

    /// Replaces an existing entry in place, otherwise appends. Returns the
    /// previous entry if there was one.
    pub fn insert(&mut self, username: impl Into<String>, entry: LeagueEntry) -> Option<LeagueEntry> {
        self.entries.insert(username.into(), entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LeagueEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

impl FromIterator<(String, LeagueEntry)> for LeagueUsers {
    fn from_iter<I: IntoIterator<Item = (String, LeagueEntry)>>(iter: I) -> Self {
        let mut users = LeagueUsers::new();
        for (name, entry) in iter {
            users.insert(name, entry);
        }
        users
    }
}

impl Serialize for LeagueUsers {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter())
    }
}

/// One row of a `SYMBOL_SEARCH` result.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SymbolSearchMatch {
    pub symbol: String,
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f64>,
}
