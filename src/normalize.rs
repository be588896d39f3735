//! Response normalizer
//!
//! Pulls the logical payload out of each provider's response envelope.
//! Missing or malformed fields yield an empty payload, never an error; the
//! caller decides whether empty output is fatal.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;

use crate::defaults;
use crate::registry::{ImageShape, PayloadShape};

/// Text payload plus token usage when the provider reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedText {
    pub text: String,
    pub tokens_used: Option<u64>,
}

/// Image payload as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    Base64(String),
    /// Hosted image that still has to be downloaded.
    Url(String),
    Empty,
}

/// Extract text from a raw response body.
pub fn normalize_text(shape: PayloadShape, body: &[u8]) -> NormalizedText {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => normalize_text_value(shape, &value),
        Err(e) => {
            tracing::debug!(error = %e, "response body is not JSON; treating as empty");
            NormalizedText::default()
        }
    }
}

pub fn normalize_text_value(shape: PayloadShape, value: &Value) -> NormalizedText {
    let text = match shape {
        PayloadShape::ChatCompletions => value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str),
        PayloadShape::GenerateContent => value
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str),
        PayloadShape::Messages => anthropic_text(value),
    };
    NormalizedText {
        text: text.unwrap_or_default().to_string(),
        tokens_used: tokens_used(shape, value),
    }
}

/// Anthropic may lead with non-text blocks (e.g. thinking); take the first
/// text block.
fn anthropic_text(value: &Value) -> Option<&str> {
    let blocks = value.get("content")?.as_array()?;
    blocks
        .iter()
        .find(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        .or_else(|| blocks.first())
        .and_then(|b| b.get("text"))
        .and_then(Value::as_str)
}

fn tokens_used(shape: PayloadShape, value: &Value) -> Option<u64> {
    match shape {
        PayloadShape::ChatCompletions => value.pointer("/usage/total_tokens")?.as_u64(),
        PayloadShape::GenerateContent => value.pointer("/usageMetadata/totalTokenCount")?.as_u64(),
        PayloadShape::Messages => {
            let input = value.pointer("/usage/input_tokens").and_then(Value::as_u64);
            let output = value.pointer("/usage/output_tokens").and_then(Value::as_u64);
            match (input, output) {
                (None, None) => None,
                (i, o) => Some(i.unwrap_or(0) + o.unwrap_or(0)),
            }
        }
    }
}

/// Extract an image from a raw response body.
pub fn normalize_image(shape: ImageShape, body: &[u8]) -> ImagePayload {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => normalize_image_value(shape, &value),
        Err(e) => {
            tracing::debug!(error = %e, "image response body is not JSON; treating as empty");
            ImagePayload::Empty
        }
    }
}

pub fn normalize_image_value(shape: ImageShape, value: &Value) -> ImagePayload {
    let non_empty = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    match shape {
        ImageShape::Images => {
            if let Some(b64) = non_empty(value.pointer("/data/0/b64_json")) {
                ImagePayload::Base64(b64)
            } else if let Some(url) = non_empty(value.pointer("/data/0/url")) {
                ImagePayload::Url(url)
            } else {
                ImagePayload::Empty
            }
        }
        ImageShape::Imagen => non_empty(value.pointer("/generatedImages/0/image/imageBytes"))
            .or_else(|| non_empty(value.pointer("/predictions/0/bytesBase64Encoded")))
            .map(ImagePayload::Base64)
            .unwrap_or(ImagePayload::Empty),
    }
}

/// Best-effort MIME type of a base64 image, defaulting to PNG.
pub fn sniff_image_mime(b64: &str) -> String {
    // The magic numbers live in the first few bytes.
    let prefix: String = b64.chars().filter(char::is_ascii).take(64).collect();
    let usable = prefix.len() - prefix.len() % 4;
    BASE64
        .decode(&prefix[..usable])
        .ok()
        .and_then(|bytes| infer::get(&bytes))
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| defaults::image::MIME_TYPE.to_string())
}

/// Encode downloaded image bytes.
pub fn encode_image_bytes(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}
