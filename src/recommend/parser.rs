//! Suggestion parsing with an ordered fallback chain
//!
//! 1. Strict JSON: an array of objects, or a single-key object wrapping one.
//! 2. Strip a code fence (optionally language-tagged), trim, retry once.
//! 3. Give up with a parse error; the caller still records the raw text.
//!
//! Individual malformed entries are dropped with a warning, never failing the batch.

use super::model::Candidate;
use crate::core::errors::RecommendError;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Outcome of reading one engine reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyContent {
    Candidates(Vec<Candidate>),
    ParseFailure(String),
}

impl ReplyContent {
    pub fn candidates(&self) -> &[Candidate] {
        match self {
            Self::Candidates(c) => c,
            Self::ParseFailure(_) => &[],
        }
    }

    pub fn into_candidates(self) -> Vec<Candidate> {
        match self {
            Self::Candidates(c) => c,
            Self::ParseFailure(_) => Vec::new(),
        }
    }
}

pub fn parse_reply(raw: &str) -> ReplyContent {
    match parse_suggestions(raw) {
        Ok(candidates) => ReplyContent::Candidates(candidates),
        Err(e) => ReplyContent::ParseFailure(e.to_string()),
    }
}

pub fn parse_suggestions(raw: &str) -> Result<Vec<Candidate>, RecommendError> {
    let entries = match extract_entries(raw) {
        Ok(entries) => entries,
        Err(first_error) => {
            tracing::debug!(
                "[SuggestionParser] Reply not directly parsable ({}), attempting cleanup",
                first_error
            );
            let cleaned = strip_code_fence(raw);
            extract_entries(cleaned).map_err(|e| {
                tracing::warn!(
                    "[SuggestionParser] Reply could not be parsed even after cleanup: {}",
                    e
                );
                RecommendError::Parse(e)
            })?
        }
    };

    let mut candidates = Vec::with_capacity(entries.len());
    for entry in &entries {
        match validate_entry(entry) {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => tracing::warn!("[SuggestionParser] Skipping entry {}: {}", entry, e),
        }
    }

    tracing::info!(
        "[SuggestionParser] {} validly structured suggestions ({} dropped)",
        candidates.len(),
        entries.len() - candidates.len()
    );
    Ok(candidates)
}

fn extract_entries(text: &str) -> Result<Vec<Value>, String> {
    let value: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;

    match value {
        Value::Array(entries) => Ok(entries),
        Value::Object(map) if map.len() == 1 => match map.into_iter().next() {
            Some((_, Value::Array(entries))) => Ok(entries),
            _ => Err("single-key object does not wrap an array".to_string()),
        },
        Value::Object(map) => Err(format!(
            "expected an array or a single-key object, got an object with {} keys",
            map.len()
        )),
        other => Err(format!("expected an array, got {}", json_kind(&other))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn fence_patterns() -> &'static (Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            Regex::new(r"^```[A-Za-z0-9_+-]*").expect("valid fence regex"),
            Regex::new(r"```$").expect("valid fence regex"),
        )
    })
}

/// Remove a leading fence (with optional language tag) and a trailing fence.
pub fn strip_code_fence(raw: &str) -> &str {
    let (leading, trailing) = fence_patterns();
    let mut text = raw.trim();

    if let Some(m) = leading.find(text) {
        text = &text[m.end()..];
    }
    if let Some(m) = trailing.find(text) {
        text = &text[..m.start()];
    }
    text.trim()
}

fn validate_entry(entry: &Value) -> Result<Candidate, RecommendError> {
    let object = entry
        .as_object()
        .ok_or_else(|| RecommendError::Validation("entry is not an object".to_string()))?;

    let title = required_text(object.get("track"), "track")?;
    let artist = required_text(object.get("artist"), "artist")?;
    Ok(Candidate::new(title, artist))
}

fn required_text(value: Option<&Value>, field: &str) -> Result<String, RecommendError> {
    let text = match value {
        None | Some(Value::Null) => {
            return Err(RecommendError::Validation(format!("missing '{}'", field)))
        }
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    if text.trim().is_empty() {
        return Err(RecommendError::Validation(format!("empty '{}'", field)));
    }
    Ok(text)
}
