//! High-level error helper utilities for user-facing error handling.
//!
//! This module provides structured error summaries, friendly suggestions,
//! and provider hints suitable for rendering on an admin surface.

use super::types::{ErrorCategory, LlmError};

/// Error kind for presentation (coarse-grained)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    RateLimit,
    Payment,
    Server,
    Network,
    Parsing,
    Configuration,
    Cancelled,
    Unknown,
}

/// Structured error summary for UI consumption
#[derive(Debug, Clone)]
pub struct ErrorSummary {
    pub kind: ErrorKind,
    pub status: Option<u16>,
    /// Message suitable for showing to the end user
    pub message: String,
    /// Raw error text for verbose display
    pub raw: String,
    pub suggestions: Vec<String>,
    /// Provider inferred from the model name, if any
    pub suggested_provider: Option<String>,
}

/// Summarize an LlmError with friendly suggestions and an optional provider hint.
pub fn summarize_error(err: &LlmError, model: Option<&str>) -> ErrorSummary {
    ErrorSummary {
        kind: map_error_kind(err),
        status: err.status_code(),
        message: err.user_message(),
        raw: err.to_string(),
        suggestions: suggest_fixes(err),
        suggested_provider: model
            .and_then(crate::resolver::infer_provider_from_model_default)
            .map(|p| p.as_str().to_string()),
    }
}

/// Map LlmError to presentation ErrorKind.
pub fn map_error_kind(err: &LlmError) -> ErrorKind {
    match err.category() {
        ErrorCategory::Authentication => ErrorKind::Auth,
        ErrorCategory::RateLimit => ErrorKind::RateLimit,
        ErrorCategory::Payment => ErrorKind::Payment,
        ErrorCategory::Provider => ErrorKind::Server,
        ErrorCategory::Network => ErrorKind::Network,
        ErrorCategory::Parsing => ErrorKind::Parsing,
        ErrorCategory::Configuration => ErrorKind::Configuration,
        ErrorCategory::Cancellation => ErrorKind::Cancelled,
        ErrorCategory::Storage => ErrorKind::Unknown,
    }
}

/// Suggest fixes based on error type.
pub fn suggest_fixes(err: &LlmError) -> Vec<String> {
    let mut tips = Vec::new();
    match err.category() {
        ErrorCategory::Authentication => {
            tips.push("Verify the provider API key in settings".to_string());
            tips.push("Check that the key has access to the requested model".to_string());
        }
        ErrorCategory::RateLimit => {
            tips.push("Wait and retry, or reduce how often generation runs".to_string());
        }
        ErrorCategory::Payment => {
            tips.push("Add credits or enable billing on the provider account".to_string());
        }
        ErrorCategory::Provider => {
            tips.push("Retry later; check the provider status page".to_string());
        }
        ErrorCategory::Configuration => {
            tips.push("Check API keys in settings or the process environment".to_string());
        }
        ErrorCategory::Network => {
            tips.push("Check network connectivity to the provider".to_string());
        }
        _ => {}
    }
    tips
}
