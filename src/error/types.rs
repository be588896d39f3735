//! Core error types.

use thiserror::Error;

/// Maximum number of characters kept from provider error bodies and usage-log
/// error messages.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 1000;

/// Coarse error category used for presentation and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    RateLimit,
    Payment,
    Authentication,
    Provider,
    Configuration,
    Network,
    Parsing,
    Cancellation,
    Storage,
}

/// Errors produced by the generation gateway.
///
/// Classification errors raised by the dispatcher (`RateLimitError`,
/// `PaymentRequired`, `AuthenticationError`, `ProviderError`) and
/// `NoProviderAvailable` are always propagated to the caller.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// HTTP 429 from a provider.
    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    /// HTTP 402 from a provider.
    #[error("Payment required: {0}")]
    PaymentRequired(String),

    /// HTTP 401 or 403 from a provider.
    #[error("Authentication failed for provider {provider} (HTTP {status}): {message}")]
    AuthenticationError {
        provider: String,
        status: u16,
        message: String,
    },

    /// Any other non-2xx status. `body` is already truncated.
    #[error("Provider {provider} returned HTTP {status}: {body}")]
    ProviderError {
        provider: String,
        status: u16,
        body: String,
    },

    /// Every provider in a fallback chain lacks a credential.
    #[error("No provider available: {0}")]
    NoProviderAvailable(String),

    /// Dispatch to a provider with no configured credential.
    #[error("No API key configured for provider {provider}")]
    MissingCredential { provider: String },

    /// Transport-level failure (connect, TLS, body read).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The bounded dispatch context elapsed.
    #[error("Request timed out: {0}")]
    TimeoutError(String),

    /// The caller cancelled the request.
    #[error("Request cancelled: {0}")]
    Cancelled(String),

    #[error("JSON error: {0}")]
    JsonError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl LlmError {
    /// Build a `ProviderError`, truncating the body.
    pub fn provider_error(provider: impl Into<String>, status: u16, body: &str) -> Self {
        Self::ProviderError {
            provider: provider.into(),
            status,
            body: truncate_chars(body, MAX_ERROR_MESSAGE_CHARS),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RateLimitError(_) => ErrorCategory::RateLimit,
            Self::PaymentRequired(_) => ErrorCategory::Payment,
            Self::AuthenticationError { .. } => ErrorCategory::Authentication,
            Self::ProviderError { .. } => ErrorCategory::Provider,
            Self::NoProviderAvailable(_)
            | Self::MissingCredential { .. }
            | Self::ConfigurationError(_)
            | Self::InvalidInput(_) => ErrorCategory::Configuration,
            Self::HttpError(_) | Self::TimeoutError(_) => ErrorCategory::Network,
            Self::JsonError(_) | Self::ParseError(_) => ErrorCategory::Parsing,
            Self::Cancelled(_) => ErrorCategory::Cancellation,
            Self::DatabaseError(_) => ErrorCategory::Storage,
        }
    }

    /// HTTP status associated with the error, when one was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::RateLimitError(_) => Some(429),
            Self::PaymentRequired(_) => Some(402),
            Self::AuthenticationError { status, .. } | Self::ProviderError { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Whether retrying the same request later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimitError(_) | Self::HttpError(_) | Self::TimeoutError(_) => true,
            Self::ProviderError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Single human-readable message for the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::RateLimitError(_) => "Rate limit exceeded. Please try again later.".to_string(),
            Self::PaymentRequired(_) => {
                "Payment required. Please add credits to your AI provider account.".to_string()
            }
            Self::AuthenticationError { provider, .. } => format!(
                "Authentication with {provider} failed. Please check the API key in settings."
            ),
            Self::ProviderError {
                provider, status, ..
            } => format!("{provider} returned an error (HTTP {status}). Please try again."),
            Self::NoProviderAvailable(_) => {
                "No image provider is configured. Please add an API key in settings.".to_string()
            }
            Self::MissingCredential { provider } => {
                format!("No API key configured for {provider}. Please add one in settings.")
            }
            Self::TimeoutError(_) => "The AI provider took too long to respond.".to_string(),
            Self::Cancelled(_) => "The request was cancelled.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Truncate `text` to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
