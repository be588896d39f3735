//! Structured output parsing
//!
//! Models asked for JSON frequently wrap it in Markdown fences, surround it
//! with prose, or leave trailing commas. [`parse_structured`] tolerates all
//! three, and reports missing expected fields instead of rejecting the whole
//! payload. Parse failures are meant to be absorbed by the caller through
//! [`parse_structured_or`].

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{LlmError, truncate_chars};

/// Expected top-level JSON kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShapeKind {
    #[default]
    Object,
    Array,
}

/// What the caller expects to find in the model output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeDescriptor {
    pub kind: ShapeKind,
    /// Array fields expected on the top-level object.
    pub expected_arrays: Vec<String>,
}

impl ShapeDescriptor {
    pub fn object() -> Self {
        Self::default()
    }

    pub fn array() -> Self {
        Self {
            kind: ShapeKind::Array,
            expected_arrays: Vec::new(),
        }
    }

    pub fn with_array(mut self, field: impl Into<String>) -> Self {
        self.expected_arrays.push(field.into());
        self
    }

    /// `{"dialogue": [...]}`
    pub fn dialogue() -> Self {
        Self::object().with_array("dialogue")
    }
}

/// Successfully parsed output, possibly with some expected fields absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResult {
    pub value: Value,
    missing: Vec<String>,
}

impl ParsedResult {
    fn new(value: Value, shape: &ShapeDescriptor) -> Self {
        let missing = shape
            .expected_arrays
            .iter()
            .filter(|field| !value.get(field.as_str()).is_some_and(Value::is_array))
            .cloned()
            .collect();
        Self { value, missing }
    }

    /// Array field, or an empty slice when absent.
    pub fn array(&self, key: &str) -> &[Value] {
        self.value
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(Value::as_str)
    }

    /// Expected array fields that were absent or not arrays.
    pub fn missing_fields(&self) -> &[String] {
        &self.missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn typed<T: DeserializeOwned>(&self) -> Result<T, LlmError> {
        Ok(serde_json::from_value(self.value.clone())?)
    }
}

/// Output that could not be parsed even after repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub message: String,
    /// Truncated raw text, for diagnostics.
    pub raw: String,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "structured output parse failed: {}", self.message)
    }
}

impl std::error::Error for ParseFailure {}

/// Remove a surrounding ```` ```json ```` or bare ```` ``` ```` fence.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`, `JSON`, ...) up to the first newline.
    let body = match rest.find('\n') {
        Some(idx) if rest[..idx].chars().all(|c| c.is_ascii_alphanumeric()) => &rest[idx + 1..],
        _ => rest,
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

pub fn parse_structured(raw: &str, shape: &ShapeDescriptor) -> Result<ParsedResult, ParseFailure> {
    let text = strip_code_fences(raw);
    let value = match serde_json::from_str::<Value>(text) {
        Ok(v) => v,
        Err(first) => repair(text).ok_or_else(|| ParseFailure {
            message: first.to_string(),
            raw: truncate_chars(raw, 200),
        })?,
    };

    let kind_ok = match shape.kind {
        ShapeKind::Object => value.is_object(),
        ShapeKind::Array => value.is_array(),
    };
    if !kind_ok {
        return Err(ParseFailure {
            message: format!("expected top-level {:?}", shape.kind),
            raw: truncate_chars(raw, 200),
        });
    }

    let parsed = ParsedResult::new(value, shape);
    if !parsed.is_complete() {
        tracing::debug!(missing = ?parsed.missing, "structured output is partial");
    }
    Ok(parsed)
}

/// Parse, or fall back to the caller's default on failure.
pub fn parse_structured_or(raw: &str, shape: &ShapeDescriptor, fallback: Value) -> ParsedResult {
    parse_structured(raw, shape).unwrap_or_else(|failure| {
        tracing::warn!(error = %failure, "using fallback structured output");
        ParsedResult::new(fallback, shape)
    })
}

fn repair(text: &str) -> Option<Value> {
    let slice = balanced_json_slice(text).unwrap_or(text);
    serde_json::from_str(slice)
        .or_else(|_| serde_json::from_str(&strip_trailing_commas(slice)))
        .ok()
}

/// First balanced `{...}` or `[...]` region, ignoring brackets in strings.
fn balanced_json_slice(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return text.get(start..=start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Drop commas that directly precede `}` or `]`, outside strings.
fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        if c == '"' {
            in_string = true;
        }
        if c == ',' {
            let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// One line of a generated dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub speaker: String,
    pub text: String,
}

/// Deterministic two-line dialogue used when generation output is unusable.
/// Unknown languages get the English lines.
pub fn fallback_dialogue(language: &str) -> Value {
    let (a, b) = match language.trim().to_ascii_lowercase().as_str() {
        "de" | "german" => ("Hallo! Wie geht es dir?", "Mir geht es gut, danke!"),
        "es" | "spanish" => ("¡Hola! ¿Cómo estás?", "Estoy bien, ¡gracias!"),
        "fr" | "french" => ("Bonjour ! Comment ça va ?", "Ça va bien, merci !"),
        "it" | "italian" => ("Ciao! Come stai?", "Sto bene, grazie!"),
        "pt" | "portuguese" => ("Olá! Como você está?", "Estou bem, obrigado!"),
        "ru" | "russian" => ("Привет! Как дела?", "Хорошо, спасибо!"),
        _ => ("Hello! How are you?", "I'm fine, thank you!"),
    };
    json!({
        "dialogue": [
            { "speaker": "A", "text": a },
            { "speaker": "B", "text": b },
        ]
    })
}
