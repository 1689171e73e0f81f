// src/merge.rs
use crate::models::{LeagueEntry, LeagueUsers};
use crate::sanitize::{is_valid_prediction, sanitize};
use crate::time::timestamp_millis_or_zero;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub merged_users: LeagueUsers,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOutcome {
    pub normalized_users: LeagueUsers,
    pub has_changes: bool,
}

/// Decides whether `incoming` should overwrite `existing`.
///
/// Fresher `updatedAt` wins first, then the longer prediction list, then the
/// higher system 1 total, then the higher system 2 total. A full tie keeps
/// the existing record.
pub fn should_replace(existing: &LeagueEntry, incoming: &LeagueEntry) -> bool {
    let existing_ts = timestamp_millis_or_zero(&existing.updated_at);
    let incoming_ts = timestamp_millis_or_zero(&incoming.updated_at);

    match (existing_ts != 0, incoming_ts != 0) {
        (true, true) => match incoming_ts.cmp(&existing_ts) {
            Ordering::Greater => return true,
            Ordering::Less => return false,
            Ordering::Equal => {}
        },
        (false, true) => return true,
        (true, false) => return false,
        (false, false) => {}
    }

    let tie_breaks = [
        incoming.predictions.len().cmp(&existing.predictions.len()),
        incoming.points.cmp(&existing.points),
        incoming.percent_points.cmp(&existing.percent_points),
    ];
    tie_breaks
        .into_iter()
        .find(|o| *o != Ordering::Equal)
        .is_some_and(|o| o == Ordering::Greater)
}

/// Folds an imported `{username: entry}` object into `existing`.
///
/// Usernames that are empty, excluded, or mapped to a non-object are skipped.
/// `added` and `updated` follow the order of `incoming`.
pub fn merge(
    existing: &LeagueUsers,
    incoming: &Value,
    exclude: &HashSet<String>,
    now: DateTime<Utc>,
) -> MergeOutcome {
    let mut merged_users = existing.clone();
    let mut added = Vec::new();
    let mut updated = Vec::new();

    let Some(incoming) = incoming.as_object() else {
        debug!("Incoming users is not an object, nothing to merge");
        return MergeOutcome {
            added,
            updated,
            merged_users,
        };
    };

    for (username, raw) in incoming {
        if username.is_empty() || exclude.contains(username) || !raw.is_object() {
            debug!("Skipping incoming record {:?}", username);
            continue;
        }
        let candidate = sanitize(username, raw, now);
        match merged_users.get(username) {
            None => {
                merged_users.insert(username.clone(), candidate);
                added.push(username.clone());
            }
            Some(current) if should_replace(current, &candidate) => {
                merged_users.insert(username.clone(), candidate);
                updated.push(username.clone());
            }
            Some(_) => {
                debug!("Keeping existing record for {}", username);
            }
        }
    }

    info!(
        "Merged league users: {} added, {} updated",
        added.len(),
        updated.len()
    );
    MergeOutcome {
        added,
        updated,
        merged_users,
    }
}

fn needs_rewrite(username: &str, raw: &Value, entry: &LeagueEntry) -> bool {
    let raw_updated_at = raw.get("updatedAt");
    if raw_updated_at.is_none() {
        return true;
    }
    if raw_updated_at.and_then(Value::as_str) != Some(entry.updated_at.as_str()) {
        return true;
    }
    let raw_predictions = raw
        .get("predictions")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if raw_predictions.len() != entry.predictions.len() {
        return true;
    }
    raw_predictions
        .iter()
        .filter(|p| is_valid_prediction(p))
        .any(|p| p.get("user").and_then(Value::as_str) != Some(username))
}

/// Canonicalizes a stored `{username: entry}` object and reports whether the
/// result differs from what was stored in a way worth persisting.
pub fn normalize(stored: &Value, now: DateTime<Utc>) -> NormalizeOutcome {
    let mut normalized_users = LeagueUsers::new();
    let mut has_changes = false;

    if let Some(stored) = stored.as_object() {
        for (username, raw) in stored {
            if username.is_empty() || !raw.is_object() {
                continue;
            }
            let entry = sanitize(username, raw, now);
            if needs_rewrite(username, raw, &entry) {
                debug!("Stored record for {} needs rewriting", username);
                has_changes = true;
            }
            normalized_users.insert(username.clone(), entry);
        }
    }

    NormalizeOutcome {
        normalized_users,
        has_changes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_timestamp;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        parse_timestamp("2024-06-01T00:00:00Z").unwrap()
    }

    fn prediction(user: &str, guess: &str, open: f64, close: f64) -> Value {
        json!({
            "id": format!("{user}-{guess}-{open}"),
            "symbol": "NVDA",
            "prediction": guess,
            "period": "week",
            "madeAt": "2024-05-20T15:00:00Z",
            "targetDate": "2024-05-27",
            "openPrice": open,
            "closePrice": close,
            "status": "resolved",
            "user": user
        })
    }

    fn entry(updated_at: &str, predictions: Vec<Value>) -> LeagueEntry {
        sanitize(
            "u",
            &json!({ "predictions": predictions, "updatedAt": updated_at }),
            now(),
        )
    }

    #[test]
    fn test_later_timestamp_wins_regardless_of_scores() {
        let strong = entry(
            "2024-05-01T00:00:00Z",
            vec![
                prediction("u", "up", 10.0, 20.0),
                prediction("u", "up", 10.0, 30.0),
            ],
        );
        let weak = entry("2024-05-02T00:00:00Z", vec![]);
        assert!(should_replace(&strong, &weak));
        assert!(!should_replace(&weak, &strong));
    }

    #[test]
    fn test_newer_offsetless_timestamp_wins() {
        let stored = entry(
            "2024-05-01T00:00:00Z",
            vec![prediction("u", "up", 10.0, 20.0)],
        );
        for stamp in ["2024-05-03T10:00:00", "2024-05-03T10:00Z", "2024-05-03T10:00:00.000+0000"] {
            let imported = entry(stamp, vec![]);
            assert!(should_replace(&stored, &imported), "{stamp}");
            assert!(!should_replace(&imported, &stored), "{stamp}");
        }
    }

    #[test]
    fn test_only_one_valid_timestamp() {
        let dated = entry("2024-05-01T00:00:00Z", vec![]);
        let undated = entry(
            "not a date",
            vec![prediction("u", "up", 10.0, 20.0)],
        );
        assert!(should_replace(&undated, &dated));
        assert!(!should_replace(&dated, &undated));
    }

    #[test]
    fn test_longer_list_wins_on_tied_timestamps() {
        let short = entry("2024-05-01T00:00:00Z", vec![prediction("u", "up", 10.0, 20.0)]);
        let long = entry(
            "2024-05-01T00:00:00Z",
            vec![
                prediction("u", "down", 10.0, 20.0),
                prediction("u", "down", 10.0, 20.0),
            ],
        );
        assert!(should_replace(&short, &long));
        assert!(!should_replace(&long, &short));
    }

    #[test]
    fn test_scores_break_remaining_ties() {
        let loser = entry("bad", vec![prediction("u", "down", 10.0, 20.0)]);
        let winner = entry("bad", vec![prediction("u", "up", 10.0, 20.0)]);
        assert!(should_replace(&loser, &winner));
        assert!(!should_replace(&winner, &loser));

        let mut a = entry("bad", vec![prediction("u", "up", 10.0, 20.0)]);
        let b = entry("bad", vec![prediction("u", "up", 10.0, 11.0)]);
        assert_eq!(a.points, b.points);
        assert!(!should_replace(&a, &b));
        a.percent_points = 5;
        assert!(should_replace(&a, &b));
    }

    #[test]
    fn test_full_tie_keeps_existing() {
        let a = entry("2024-05-01T00:00:00Z", vec![prediction("u", "up", 10.0, 20.0)]);
        let b = a.clone();
        assert!(!should_replace(&a, &b));
    }

    #[test]
    fn test_merge_adds_updates_and_excludes() {
        let existing: LeagueUsers = vec![
            ("alice".to_string(), entry("2024-05-01T00:00:00Z", vec![])),
            ("bob".to_string(), entry("2024-05-01T00:00:00Z", vec![])),
        ]
        .into_iter()
        .collect();
        let incoming = json!({
            "carol": { "predictions": [prediction("someone", "up", 1.0, 2.0)], "updatedAt": "2024-05-03T00:00:00Z" },
            "alice": { "predictions": [], "updatedAt": "2024-05-02T00:00:00Z" },
            "bob": { "predictions": [], "updatedAt": "2024-04-01T00:00:00Z" },
            "eve": { "predictions": [], "updatedAt": "2024-05-09T00:00:00Z" },
            "": { "predictions": [] },
            "frank": "not an entry"
        });
        let exclude: HashSet<String> = ["eve".to_string()].into_iter().collect();

        let outcome = merge(&existing, &incoming, &exclude, now());
        assert_eq!(outcome.added, vec!["carol"]);
        assert_eq!(outcome.updated, vec!["alice"]);
        assert_eq!(outcome.merged_users.len(), 3);
        assert!(!outcome.merged_users.contains_key("eve"));
        assert!(!outcome.merged_users.contains_key("frank"));
        assert_eq!(
            outcome.merged_users.get("alice").unwrap().updated_at,
            "2024-05-02T00:00:00Z"
        );
        assert_eq!(
            outcome.merged_users.get("bob").unwrap().updated_at,
            "2024-05-01T00:00:00Z"
        );
        let carol = outcome.merged_users.get("carol").unwrap();
        assert_eq!(carol.predictions[0].user, "carol");
        assert_eq!(carol.points, 1);
        assert_eq!(carol.percent_points, 100);
        let order: Vec<_> = outcome.merged_users.usernames().collect();
        assert_eq!(order, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_merge_does_not_touch_input() {
        let existing: LeagueUsers =
            vec![("alice".to_string(), entry("2024-05-01T00:00:00Z", vec![]))]
                .into_iter()
                .collect();
        let before = existing.clone();
        let incoming = json!({ "alice": { "updatedAt": "2024-05-05T00:00:00Z" } });
        let outcome = merge(&existing, &incoming, &HashSet::new(), now());
        assert_eq!(outcome.updated, vec!["alice"]);
        assert_eq!(existing, before);
    }

    #[test]
    fn test_merge_non_object_incoming() {
        let existing = LeagueUsers::new();
        let outcome = merge(&existing, &json!([1, 2]), &HashSet::new(), now());
        assert!(outcome.added.is_empty());
        assert!(outcome.merged_users.is_empty());
    }

    #[test]
    fn test_normalize_clean_data_has_no_changes() {
        let stored = json!({
            "alice": {
                "predictions": [prediction("alice", "up", 10.0, 12.0)],
                "points": 1,
                "percentPoints": 20,
                "updatedAt": "2024-05-01T00:00:00.000Z"
            }
        });
        let outcome = normalize(&stored, now());
        assert!(!outcome.has_changes);
        assert_eq!(outcome.normalized_users.len(), 1);
    }

    #[test]
    fn test_normalize_flags_missing_updated_at() {
        let stored = json!({ "alice": { "predictions": [] } });
        let outcome = normalize(&stored, now());
        assert!(outcome.has_changes);
        assert_eq!(
            outcome.normalized_users.get("alice").unwrap().updated_at,
            "2024-06-01T00:00:00.000Z"
        );
    }

    #[test]
    fn test_normalize_flags_dropped_prediction() {
        let stored = json!({
            "alice": {
                "predictions": [prediction("alice", "up", 1.0, 2.0), { "symbol": 3 }],
                "updatedAt": "2024-05-01T00:00:00.000Z"
            }
        });
        let outcome = normalize(&stored, now());
        assert!(outcome.has_changes);
        assert_eq!(outcome.normalized_users.get("alice").unwrap().predictions.len(), 1);
    }

    #[test]
    fn test_normalize_flags_foreign_owner() {
        let stored = json!({
            "alice": {
                "predictions": [prediction("bob", "up", 1.0, 2.0)],
                "updatedAt": "2024-05-01T00:00:00.000Z"
            },
            "": { "predictions": [] },
            "ghost": 12
        });
        let outcome = normalize(&stored, now());
        assert!(outcome.has_changes);
        assert_eq!(outcome.normalized_users.len(), 1);
        let alice = outcome.normalized_users.get("alice").unwrap();
        assert_eq!(alice.predictions[0].user, "alice");
    }
}
