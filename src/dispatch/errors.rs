//! HTTP error classification
//!
//! Maps a non-2xx provider response onto the gateway error taxonomy.

use reqwest::header::HeaderMap;

use crate::error::{LlmError, MAX_ERROR_MESSAGE_CHARS, truncate_chars};
use crate::types::ProviderId;

/// Classify a non-2xx status.
///
/// 429 → `RateLimitError`, 402 → `PaymentRequired`, 401/403 →
/// `AuthenticationError`, anything else → `ProviderError` with the body
/// truncated.
pub fn classify_http_error(
    provider: ProviderId,
    status: u16,
    body_text: &str,
    headers: &HeaderMap,
) -> LlmError {
    let body_sample = truncate_chars(body_text, 200);
    match status {
        429 => {
            let retry_after = headers
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            LlmError::RateLimitError(format!(
                "provider={provider} http=429 retry_after={retry_after} body_sample={body_sample}"
            ))
        }
        402 => LlmError::PaymentRequired(format!(
            "provider={provider} http=402 body_sample={body_sample}"
        )),
        401 | 403 => LlmError::AuthenticationError {
            provider: provider.to_string(),
            status,
            message: provider_message(body_text)
                .unwrap_or_else(|| truncate_chars(body_text, MAX_ERROR_MESSAGE_CHARS)),
        },
        _ => LlmError::provider_error(provider.as_str(), status, body_text),
    }
}

/// Best-effort `error.message` (OpenAI, Gemini, Anthropic and Z.AI all use it).
fn provider_message(body_text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body_text).ok()?;
    let error = value.get("error")?;
    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())?;
    Some(truncate_chars(message, MAX_ERROR_MESSAGE_CHARS))
}
