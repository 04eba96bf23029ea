//! Parsing and validation of backend answers.

use crate::job_store::MAX_SCORE;
use crate::llm::{extract_json_block, strip_thinking};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a backend answer could not be turned into scores.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScoreParseError {
    #[error("Empty response")]
    Empty,

    #[error("Malformed JSON: {0}")]
    MalformedJson(String),

    #[error("Missing field '{0}'")]
    MissingField(&'static str),

    #[error("Field '{field}' is not an integer between 0 and 100: {value}")]
    OutOfRange { field: &'static str, value: String },
}

impl ScoreParseError {
    /// Valid JSON that breaks the four-field contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            ScoreParseError::MissingField(_) | ScoreParseError::OutOfRange { .. }
        )
    }
}

/// A validated verdict for one posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreResult {
    pub match_score: u8,
    pub likelihood_score: u8,
    pub match_reason: String,
    pub likelihood_reason: String,
}

impl ScoreResult {
    /// The text stored in the record's `match_reason` column.
    pub fn combined_reason(&self) -> String {
        format_reason(&self.match_reason, &self.likelihood_reason)
    }
}

pub fn format_reason(match_reason: &str, likelihood_reason: &str) -> String {
    format!(
        "Match Reason: {}\n\nLikelihood Reason: {}",
        match_reason, likelihood_reason
    )
}

/// Strip reasoning blocks and code fences around the JSON payload.
pub fn clean_response(raw: &str) -> String {
    let without_thinking = strip_thinking(raw);
    extract_json_block(&without_thinking).trim().to_string()
}

fn parse_object(text: &str) -> Result<Map<String, Value>, ScoreParseError> {
    let parsed = serde_json::from_str::<Value>(text).or_else(|first_err| {
        // Models sometimes wrap the object in prose
        match (text.find('{'), text.rfind('}')) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str::<Value>(&text[start..=end])
                    .map_err(|_| ScoreParseError::MalformedJson(first_err.to_string()))
            }
            _ => Err(ScoreParseError::MalformedJson(first_err.to_string())),
        }
    })?;

    match parsed {
        Value::Object(map) => Ok(map),
        other => Err(ScoreParseError::MalformedJson(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

fn score_field(map: &Map<String, Value>, field: &'static str) -> Result<u8, ScoreParseError> {
    let value = match map.get(field) {
        None | Some(Value::Null) => return Err(ScoreParseError::MissingField(field)),
        Some(value) => value,
    };
    let out_of_range = || ScoreParseError::OutOfRange {
        field,
        value: value.to_string(),
    };

    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(out_of_range)?;

    if number.fract() != 0.0 || number < 0.0 || number > f64::from(MAX_SCORE) {
        return Err(out_of_range());
    }
    Ok(number as u8)
}

fn text_field(map: &Map<String, Value>, field: &'static str) -> Result<String, ScoreParseError> {
    match map.get(field) {
        None | Some(Value::Null) => Err(ScoreParseError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(other) => Ok(other.to_string()),
    }
}

/// Parse a raw backend answer into a validated [`ScoreResult`].
pub fn parse_score_response(raw: &str) -> Result<ScoreResult, ScoreParseError> {
    let cleaned = clean_response(raw);
    if cleaned.is_empty() {
        return Err(ScoreParseError::Empty);
    }
    let map = parse_object(&cleaned)?;

    Ok(ScoreResult {
        match_score: score_field(&map, "match_score")?,
        likelihood_score: score_field(&map, "likelihood_score")?,
        match_reason: text_field(&map, "match_reason")?,
        likelihood_reason: text_field(&map, "likelihood_reason")?,
    })
}
