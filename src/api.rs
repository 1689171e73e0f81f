// src/api.rs
//! Interpretation of Alpha Vantage `SYMBOL_SEARCH` payloads. Field names and
//! the `Note`/`Information`/`Error Message` conventions are the provider's.

use crate::models::SymbolSearchMatch;
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

const BEST_MATCHES: &str = "bestMatches";
const NOTE: &str = "Note";
const INFORMATION: &str = "Information";
const ERROR_MESSAGE: &str = "Error Message";

const SYMBOL: &str = "1. symbol";
const NAME: &str = "2. name";
const TYPE: &str = "3. type";
const REGION: &str = "4. region";
const CURRENCY: &str = "8. currency";
const MATCH_SCORE: &str = "9. matchScore";

pub const UNEXPECTED_RESPONSE: &str = "Unexpected response from symbol search.";

/// Outcome of a search call. Errors are carried as data: `message` is set for
/// rate limits, provider errors and shape mismatches.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub matches: Vec<SymbolSearchMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub is_rate_limited: bool,
    pub is_cacheable: bool,
}

impl SearchResponse {
    fn failure(message: impl Into<String>, is_rate_limited: bool) -> Self {
        SearchResponse {
            matches: Vec::new(),
            message: Some(message.into()),
            is_rate_limited,
            is_cacheable: false,
        }
    }

    fn unexpected() -> Self {
        Self::failure(UNEXPECTED_RESPONSE, false)
    }
}

fn trimmed_text<'a>(value: Option<&'a Value>) -> Option<&'a str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_score(value: Option<&Value>) -> Option<f64> {
    let score = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    score.filter(|s| s.is_finite())
}

/// Parses one `bestMatches` row. Rows without both a symbol and a name are
/// rejected.
pub fn parse_match(raw: &Value) -> Option<SymbolSearchMatch> {
    let obj = raw.as_object()?;
    let optional = |key: &str| trimmed_text(obj.get(key)).map(str::to_string);
    Some(SymbolSearchMatch {
        symbol: trimmed_text(obj.get(SYMBOL))?.to_string(),
        name: trimmed_text(obj.get(NAME))?.to_string(),
        kind: optional(TYPE),
        region: optional(REGION),
        currency: optional(CURRENCY),
        match_score: parse_score(obj.get(MATCH_SCORE)),
    })
}

/// Classifies an arbitrary decoded payload from the search endpoint.
pub fn parse_response(payload: &Value) -> SearchResponse {
    let Some(obj) = payload.as_object() else {
        warn!("Symbol search returned a non-object payload");
        return SearchResponse::unexpected();
    };

    if let Some(note) = trimmed_text(obj.get(NOTE)).or_else(|| trimmed_text(obj.get(INFORMATION))) {
        warn!("Symbol search rate limited: {}", note);
        return SearchResponse::failure(note, true);
    }

    if let Some(error) = trimmed_text(obj.get(ERROR_MESSAGE)) {
        warn!("Symbol search failed: {}", error);
        return SearchResponse::failure(error, false);
    }

    let Some(rows) = obj.get(BEST_MATCHES).and_then(Value::as_array) else {
        warn!("Symbol search payload has no {} list", BEST_MATCHES);
        return SearchResponse::unexpected();
    };

    let matches: Vec<SymbolSearchMatch> = rows.iter().filter_map(parse_match).collect();
    debug!(
        "Symbol search returned {} match(es), {} row(s) dropped",
        matches.len(),
        rows.len() - matches.len()
    );
    SearchResponse {
        matches,
        message: None,
        is_rate_limited: false,
        is_cacheable: true,
    }
}
