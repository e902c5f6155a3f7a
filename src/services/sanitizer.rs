//! Extraction of a JSON object from free-form LLM output.
//!
//! Models asked for "only JSON" still wrap it in markdown fences, prefix it
//! with prose, leave trailing commas, or quote song titles inside string
//! values without escaping them. [`sanitize_and_extract`] tries progressively
//! more aggressive repairs and returns the first object that parses.
//!
//! Braces inside string values are not treated specially when locating
//! candidate objects in surrounding prose.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

/// How much of the raw text is kept in errors for logging.
const EXCERPT_LEN: usize = 500;

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct SanitizeError {
    /// Start of the raw text that could not be parsed.
    pub excerpt: String,
    /// Last underlying parser message.
    pub message: String,
}

impl SanitizeError {
    fn new(raw: &str, message: impl Into<String>) -> Self {
        Self {
            excerpt: raw.chars().take(EXCERPT_LEN).collect(),
            message: message.into(),
        }
    }
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```(?:json|JSON)?\s*([\s\S]*?)\s*```").expect("valid fence regex"))
}

fn object_separator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""\s*\}\s*""#).expect("valid separator regex"))
}

fn array_separator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""\s*\]\s*""#).expect("valid separator regex"))
}

fn trailing_comma_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",(\s*[\}\]])").expect("valid trailing comma regex"))
}

fn reason_field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // The value ends at the first quote followed by the next key, or by the end of the object/array.
    RE.get_or_init(|| {
        Regex::new(r#""reason"\s*:\s*"(.*?)"(\s*(?:,\s*"|\}|\]))"#).expect("valid reason regex")
    })
}

/// Turn raw LLM text into a JSON object, repairing it if needed.
pub fn sanitize_and_extract(raw: &str) -> Result<Map<String, Value>, SanitizeError> {
    if raw.trim().is_empty() {
        return Err(SanitizeError::new(raw, "empty response"));
    }

    let mut last_error = match parse_object(raw) {
        Ok(object) => return Ok(object),
        Err(e) => e,
    };

    // Fenced block, parsed as-is.
    let fenced = fence_regex()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str());
    if let Some(inner) = fenced {
        match parse_object(inner) {
            Ok(object) => return Ok(object),
            Err(e) => last_error = e,
        }
    }

    // Quote repair on the fence interior (or the whole text), then separator cleanup.
    let repaired = post_process(&escape_inner_quotes(fenced.unwrap_or(raw)));
    match parse_object(&repaired) {
        Ok(object) => return Ok(object),
        Err(e) => last_error = e,
    }

    // Locate candidate objects in the raw text and retry each with targeted repairs.
    for candidate in candidate_objects(raw) {
        let attempts = [
            candidate.to_string(),
            repair_reason_fields(candidate),
            post_process(&escape_inner_quotes(&repair_reason_fields(candidate))),
        ];
        for attempt in &attempts {
            match parse_object(attempt) {
                Ok(object) => {
                    tracing::debug!("Recovered JSON object from surrounding text");
                    return Ok(object);
                }
                Err(e) => last_error = e,
            }
        }
    }

    Err(SanitizeError::new(raw, last_error))
}

fn parse_object(text: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(format!("expected a JSON object, found {}", value_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Escape quotes that appear inside a string literal but do not close it.
///
/// A quote closes the current string when the next non-whitespace character
/// is a structural one (`,` `}` `]` `:`) or the text ends; any other quote
/// inside a string is taken as part of the value. Escape sequences are copied
/// through untouched.
pub fn escape_inner_quotes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut escape_next = false;

    for (i, &c) in chars.iter().enumerate() {
        if escape_next {
            out.push(c);
            escape_next = false;
            continue;
        }
        if c == '\\' {
            out.push(c);
            escape_next = true;
            continue;
        }
        if c != '"' {
            out.push(c);
            continue;
        }
        if !in_string {
            in_string = true;
            out.push(c);
            continue;
        }

        let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
        match next {
            None | Some(',') | Some('}') | Some(']') | Some(':') => {
                in_string = false;
                out.push(c);
            }
            Some(_) => out.push_str("\\\""),
        }
    }

    out
}

/// Collapse `"}"` / `"]"` artifacts into separators and drop trailing commas.
fn post_process(text: &str) -> String {
    let text = object_separator_regex().replace_all(text, r#""},{""#);
    let text = array_separator_regex().replace_all(&text, r#""],""#);
    trailing_comma_regex().replace_all(&text, "$1").into_owned()
}

/// Escape stray quotes inside every `"reason": "..."` value.
fn repair_reason_fields(text: &str) -> String {
    reason_field_regex()
        .replace_all(text, |caps: &regex::Captures| {
            format!(r#""reason":"{}"{}"#, escape_unescaped_quotes(&caps[1]), &caps[2])
        })
        .into_owned()
}

fn escape_unescaped_quotes(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}

/// Every balanced top-level `{...}` block, followed by the widest
/// first-brace-to-last-brace span when it differs.
fn candidate_objects(text: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let mut depth = 0usize;
    let mut start = None;

    for (i, c) in text.char_indices() {
        match c {
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        candidates.push(&text[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }

    if let (Some(first), Some(last)) = (text.find('{'), text.rfind('}')) {
        if first < last {
            let widest = &text[first..=last];
            if !candidates.contains(&widest) {
                candidates.push(widest);
            }
        }
    }

    candidates
}
