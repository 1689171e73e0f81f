// src/scoring.rs
use crate::models::{Direction, LeagueUsers, Prediction, Status};
use serde::Serialize;

/// Which of the two point schemes to rank by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringSystem {
    /// Correct/incorrect count.
    WinLoss,
    /// Cumulative signed percentage return.
    PercentReturn,
}

fn actual_direction(open: f64, close: f64) -> Direction {
    // A flat close counts as down.
    if close > open {
        Direction::Up
    } else {
        Direction::Down
    }
}

fn settled_prices(p: &Prediction) -> Option<(f64, f64)> {
    if !p.is_scorable() {
        return None;
    }
    Some((p.open_price?, p.close_price?))
}

/// +1 for every resolved prediction that called the direction right, -1 otherwise.
pub fn score_system_one(predictions: &[Prediction]) -> i64 {
    predictions
        .iter()
        .filter_map(|p| settled_prices(p).map(|(open, close)| (p.prediction, open, close)))
        .map(|(guess, open, close)| {
            if guess == actual_direction(open, close) {
                1
            } else {
                -1
            }
        })
        .sum()
}

/// Sum of the percent move of each resolved prediction, signed by the guess.
/// Predictions opened at exactly zero are skipped. The result is not rounded.
pub fn score_system_two(predictions: &[Prediction]) -> f64 {
    predictions
        .iter()
        .filter_map(|p| settled_prices(p).map(|(open, close)| (p.prediction, open, close)))
        .filter(|(_, open, _)| *open != 0.0)
        .map(|(guess, open, close)| {
            let percent = (close - open) / open * 100.0;
            match guess {
                Direction::Up => percent,
                Direction::Down => -percent,
            }
        })
        .sum()
}

/// Rounds halves toward positive infinity.
pub fn round_half_up(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor as i64 + 1
    } else {
        floor as i64
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub username: String,
    pub points: i64,
    pub resolved: usize,
    pub pending: usize,
}

/// Ranks users by the stored total of `system`, highest first, then by name.
pub fn leaderboard(users: &LeagueUsers, system: ScoringSystem) -> Vec<Standing> {
    let mut standings: Vec<Standing> = users
        .iter()
        .map(|(username, entry)| {
            let resolved = entry
                .predictions
                .iter()
                .filter(|p| p.status == Status::Resolved)
                .count();
            Standing {
                username: username.to_string(),
                points: match system {
                    ScoringSystem::WinLoss => entry.points,
                    ScoringSystem::PercentReturn => entry.percent_points,
                },
                resolved,
                pending: entry.predictions.len() - resolved,
            }
        })
        .collect();
    standings.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.username.cmp(&b.username)));
    standings
}
