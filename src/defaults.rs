//! Default Configuration Values
//!
//! Centralizes default values used throughout the gateway.

use std::time::Duration;

/// HTTP client default configurations
pub mod http {
    use super::*;

    /// Upper bound for a single dispatch attempt, including normalization.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// Default connection timeout for establishing HTTP connections
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Default User-Agent string for HTTP requests
    pub const USER_AGENT: &str = concat!("genai-gateway/", env!("CARGO_PKG_VERSION"));
}

/// Provider base URLs
pub mod base_urls {
    pub const LOVABLE: &str = "https://ai.gateway.lovable.dev/v1";
    pub const OPENAI: &str = "https://api.openai.com/v1";
    pub const GEMINI: &str = "https://generativelanguage.googleapis.com/v1beta";
    pub const ANTHROPIC: &str = "https://api.anthropic.com/v1";
    pub const ZAI: &str = "https://api.z.ai/api/paas/v4";
    pub const MISTRAL: &str = "https://api.mistral.ai/v1";
}

/// Default models per provider
pub mod models {
    pub const LOVABLE_TEXT: &str = "google/gemini-2.5-flash";
    pub const OPENAI_TEXT: &str = "gpt-4o-mini";
    pub const OPENAI_IMAGE: &str = "dall-e-3";
    pub const GEMINI_TEXT: &str = "gemini-2.5-flash";
    pub const GEMINI_IMAGE: &str = "imagen-3.0-generate-002";
    pub const ANTHROPIC_TEXT: &str = "claude-sonnet-4-20250514";
    pub const ZAI_TEXT: &str = "glm-4.6";
    pub const ZAI_IMAGE: &str = "cogview-4";
    pub const MISTRAL_TEXT: &str = "mistral-large-latest";
}

/// Anthropic Messages API parameters
pub mod anthropic {
    pub const API_VERSION: &str = "2023-06-01";
    pub const MAX_TOKENS: u32 = 4096;
}

/// Image request parameters
pub mod image {
    pub const SIZE: &str = "1024x1024";
    pub const MIME_TYPE: &str = "image/png";
}
