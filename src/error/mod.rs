//! Error Handling Module
//!
//! This module provides the error taxonomy for the generation gateway:
//! - Core error types (`LlmError`, `ErrorCategory`)
//! - User-facing error helpers and summaries
//! - Type conversions from common error types
//!
//! # Example
//!
//! ```rust,ignore
//! use genai_gateway::error::{LlmError, ErrorCategory};
//!
//! let error = LlmError::RateLimitError("provider=openai http=429".into());
//! assert_eq!(error.category(), ErrorCategory::RateLimit);
//! assert_eq!(error.user_message(), "Rate limit exceeded. Please try again later.");
//! ```

mod conversions;
pub mod helpers;
pub mod types;

pub use helpers::*;
pub use types::*;
