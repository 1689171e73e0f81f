// src/sanitize.rs
//! Turns untrusted league records (stored or imported JSON) into canonical
//! [`LeagueEntry`] values. Nothing here fails: bad predictions are dropped
//! and bad totals fall back to zero.

use crate::models::{Direction, LeagueEntry, Period, Prediction, Status};
use crate::scoring::round_half_up;
use crate::time::to_iso_string;
use chrono::{DateTime, Utc};
use log::debug;
use serde_json::Value;

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Names the first field that keeps `raw` from being a prediction, or
/// `None` when the shape is valid.
pub fn prediction_defect(raw: &Value) -> Option<&'static str> {
    let Some(obj) = raw.as_object() else {
        return Some("not an object");
    };
    let status_ok = match obj.get("status") {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s == "pending" || s == "resolved",
        Some(_) => false,
    };
    if !obj.get("symbol").is_some_and(Value::is_string) {
        Some("symbol")
    } else if obj
        .get("prediction")
        .and_then(Value::as_str)
        .and_then(Direction::parse)
        .is_none()
    {
        Some("prediction")
    } else if obj
        .get("period")
        .and_then(Value::as_str)
        .and_then(Period::parse)
        .is_none()
    {
        Some("period")
    } else if !obj.get("madeAt").is_some_and(Value::is_string) {
        Some("madeAt")
    } else if !obj.get("targetDate").is_some_and(Value::is_string) {
        Some("targetDate")
    } else if !status_ok {
        Some("status")
    } else {
        None
    }
}

/// Shape check for a raw prediction. Entries failing it are discarded whole.
pub fn is_valid_prediction(raw: &Value) -> bool {
    prediction_defect(raw).is_none()
}

/// Numbers pass through, numeric strings are parsed, anything else is `None`.
pub fn coerce_price(value: Option<&Value>) -> Option<f64> {
    let price = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    price.filter(|p| p.is_finite())
}

fn coerce_total(value: Option<&Value>) -> i64 {
    coerce_price(value).map(round_half_up).unwrap_or(0)
}

/// Builds a canonical prediction from a raw one that passed
/// [`is_valid_prediction`]. Ownership is always reassigned to `username`.
fn sanitize_prediction(username: &str, raw: &Value) -> Option<Prediction> {
    let obj = raw.as_object()?;
    let status = match obj.get("status").and_then(Value::as_str) {
        Some("resolved") => Status::Resolved,
        _ => Status::Pending,
    };
    Some(Prediction {
        id: obj
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        symbol: obj.get("symbol")?.as_str()?.to_string(),
        prediction: Direction::parse(obj.get("prediction")?.as_str()?)?,
        period: Period::parse(obj.get("period")?.as_str()?)?,
        made_at: obj.get("madeAt")?.as_str()?.to_string(),
        target_date: obj.get("targetDate")?.as_str()?.to_string(),
        open_price: coerce_price(obj.get("openPrice")),
        close_price: coerce_price(obj.get("closePrice")),
        status,
        user: username.to_string(),
    })
}

/// Keeps only well-formed predictions, in their original order.
pub fn sanitize_predictions(username: &str, raw: Option<&Value>) -> Vec<Prediction> {
    let Some(list) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };
    list.iter()
        .enumerate()
        .filter_map(|(index, p)| match prediction_defect(p) {
            Some(reason) => {
                debug!(
                    "Dropping prediction {} for {}: invalid {}",
                    index, username, reason
                );
                None
            }
            None => sanitize_prediction(username, p),
        })
        .collect()
}

/// Canonicalizes one user's record.
///
/// Totals are recomputed whenever any prediction survives; otherwise the raw
/// `points`/`percentPoints` are trusted after integer coercion. A missing or
/// empty `updatedAt` is stamped with `now`.
pub fn sanitize(username: &str, raw: &Value, now: DateTime<Utc>) -> LeagueEntry {
    let predictions = sanitize_predictions(username, raw.get("predictions"));
    let updated_at = non_empty_str(raw.get("updatedAt"))
        .map(str::to_string)
        .unwrap_or_else(|| to_iso_string(now));

    let mut entry = LeagueEntry {
        predictions,
        points: 0,
        percent_points: 0,
        updated_at,
    };
    if entry.predictions.is_empty() {
        entry.points = coerce_total(raw.get("points"));
        entry.percent_points = coerce_total(raw.get("percentPoints"));
    } else {
        entry.recompute_totals();
    }
    entry
}
