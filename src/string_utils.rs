//! String helpers.
//!
//! Lengths and positions are counted in `char`s, never in bytes, so
//! multi-byte text is reversed and truncated on character boundaries.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_SUFFIX: &str = "...";

const VOWELS: &str = "aeiouAEIOU";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StringError {
    #[error("max_length must be at least the length of suffix ({max_length} < {suffix_length})")]
    InvalidLength {
        max_length: usize,
        suffix_length: usize,
    },
    #[error("Data must be UTF-8 encoded: {0}")]
    InvalidEncoding(String),
    #[error("Data must contain JSON encoded string: {0}")]
    InvalidJson(String),
    #[error("JSON payload must decode to a string, got {0}")]
    NotAString(&'static str),
}

pub type StringResult<T> = Result<T, StringError>;

pub fn reverse_string(s: &str) -> String {
    s.chars().rev().collect()
}

/// Case-insensitive palindrome check that ignores whitespace (but not
/// punctuation).
pub fn is_palindrome(s: &str) -> bool {
    let cleaned: Vec<char> = s
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    cleaned.iter().eq(cleaned.iter().rev())
}

pub fn count_vowels(s: &str) -> usize {
    s.chars().filter(|c| VOWELS.contains(*c)).count()
}

/// Upper-cases the first character of every word and lower-cases the rest.
/// Runs of whitespace collapse into a single space.
pub fn capitalize_words(s: &str) -> String {
    s.split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Shortens `s` to at most `max_length` characters, ending in `suffix` when
/// anything was cut.
pub fn truncate_string(s: &str, max_length: usize, suffix: &str) -> StringResult<String> {
    let suffix_length = suffix.chars().count();
    if max_length < suffix_length {
        return Err(StringError::InvalidLength {
            max_length,
            suffix_length,
        });
    }
    if s.chars().count() <= max_length {
        return Ok(s.to_string());
    }
    let kept: String = s.chars().take(max_length - suffix_length).collect();
    Ok(kept + suffix)
}

/// Decodes a UTF-8 payload holding a single JSON string.
pub fn load_string_from_file(data: &[u8]) -> StringResult<String> {
    let decoded =
        std::str::from_utf8(data).map_err(|e| StringError::InvalidEncoding(e.to_string()))?;
    let value: Value =
        serde_json::from_str(decoded).map_err(|e| StringError::InvalidJson(e.to_string()))?;
    match value {
        Value::String(s) => Ok(s),
        other => {
            debug!("rejected JSON payload: {}", other);
            Err(StringError::NotAString(json_type_name(&other)))
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
