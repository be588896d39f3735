//! Request and result types shared across the gateway.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LlmError;

/// Registered provider ids.
///
/// `Lovable` is the gateway alias: it speaks the OpenAI chat envelope for text
/// and resolves to a concrete image provider during fallback selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderId {
    #[serde(rename = "lovable")]
    Lovable,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "geminiV22")]
    GeminiV22,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "zai")]
    Zai,
    #[serde(rename = "mistral")]
    Mistral,
}

impl ProviderId {
    pub const ALL: [ProviderId; 7] = [
        ProviderId::Lovable,
        ProviderId::OpenAi,
        ProviderId::Gemini,
        ProviderId::GeminiV22,
        ProviderId::Anthropic,
        ProviderId::Zai,
        ProviderId::Mistral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lovable => "lovable",
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::GeminiV22 => "geminiV22",
            Self::Anthropic => "anthropic",
            Self::Zai => "zai",
            Self::Mistral => "mistral",
        }
    }

    /// Parse a provider id or one of its common aliases (case-insensitive).
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['_', '-', '.'], "");
        match normalized.as_str() {
            "lovable" | "lovablegateway" => Some(Self::Lovable),
            "openai" => Some(Self::OpenAi),
            "gemini" | "google" => Some(Self::Gemini),
            "geminiv22" | "geminiv2" => Some(Self::GeminiV22),
            "anthropic" | "claude" => Some(Self::Anthropic),
            "zai" | "zhipu" | "glm" => Some(Self::Zai),
            "mistral" => Some(Self::Mistral),
            _ => None,
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::Lovable => "LOVABLE_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
            Self::GeminiV22 => "GEMINI_V22_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Zai => "ZAI_API_KEY",
            Self::Mistral => "MISTRAL_API_KEY",
        }
    }

    /// Environment variable overriding this provider's base URL.
    pub fn base_url_env_var(&self) -> &'static str {
        match self {
            Self::Lovable => "LOVABLE_BASE_URL",
            Self::OpenAi => "OPENAI_BASE_URL",
            Self::Gemini => "GEMINI_BASE_URL",
            Self::GeminiV22 => "GEMINI_V22_BASE_URL",
            Self::Anthropic => "ANTHROPIC_BASE_URL",
            Self::Zai => "ZAI_BASE_URL",
            Self::Mistral => "MISTRAL_BASE_URL",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| LlmError::InvalidInput(format!("Unknown provider: {s}")))
    }
}

/// What a request generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    Text,
    Image,
}

impl GenerationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

/// Requested shape of text output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Json,
    #[default]
    Text,
}

/// Named gateway operations, recorded in the usage log.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operation {
    GenerateDialogue,
    GenerateImage,
    Retell,
    StructureText,
    Custom(String),
}

impl Operation {
    pub fn as_str(&self) -> &str {
        match self {
            Self::GenerateDialogue => "generate-dialogue",
            Self::GenerateImage => "generate-image",
            Self::Retell => "retell",
            Self::StructureText => "structure-text",
            Self::Custom(name) => name,
        }
    }

    pub fn default_kind(&self) -> GenerationKind {
        match self {
            Self::GenerateImage => GenerationKind::Image,
            _ => GenerationKind::Text,
        }
    }

    pub fn default_response_mode(&self) -> ResponseMode {
        match self {
            Self::GenerateDialogue | Self::StructureText => ResponseMode::Json,
            _ => ResponseMode::Text,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single logical generation request. Constructed per call and consumed by
/// the gateway.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub kind: GenerationKind,
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub model: Option<String>,
    /// Raw provider override as supplied by the caller; unknown values are ignored.
    pub provider_override: Option<String>,
    pub response_mode: ResponseMode,
    pub operation: Operation,
    /// Correlation metadata (entity ids) copied into the usage log.
    pub metadata: Map<String, Value>,
}

impl GenerationRequest {
    pub fn new(kind: GenerationKind, prompt: impl Into<String>) -> Self {
        let operation = match kind {
            GenerationKind::Text => Operation::Custom("generate-text".to_string()),
            GenerationKind::Image => Operation::GenerateImage,
        };
        Self {
            kind,
            system_prompt: None,
            prompt: prompt.into(),
            model: None,
            provider_override: None,
            response_mode: ResponseMode::Text,
            operation,
            metadata: Map::new(),
        }
    }

    pub fn text(prompt: impl Into<String>) -> Self {
        Self::new(GenerationKind::Text, prompt)
    }

    pub fn image(prompt: impl Into<String>) -> Self {
        Self::new(GenerationKind::Image, prompt)
    }

    /// Build a request for one of the named operations, using its default
    /// kind and response mode.
    pub fn for_operation(operation: Operation, prompt: impl Into<String>) -> Self {
        let mut req = Self::new(operation.default_kind(), prompt);
        req.response_mode = operation.default_response_mode();
        req.operation = operation;
        req
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider_override = Some(provider.into());
        self
    }

    pub fn response_mode(mut self, mode: ResponseMode) -> Self {
        self.response_mode = mode;
        self
    }

    pub fn json(self) -> Self {
        self.response_mode(ResponseMode::Json)
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    /// Attach a correlation field, e.g. `entity("article_id", 42)`.
    pub fn entity(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Outcome of a successful generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: Option<String>,
    pub image_base64: Option<String>,
    pub image_mime_type: Option<String>,
    /// Provider actually invoked, after any fallback.
    pub provider_used: ProviderId,
    pub model_used: String,
    pub duration_ms: u64,
    pub tokens_used: Option<u64>,
    pub success: bool,
}

impl GenerationResult {
    /// Whether the provider returned no usable payload. Callers decide whether
    /// this is fatal.
    pub fn is_empty(&self) -> bool {
        let text_empty = self.text.as_deref().is_none_or(|t| t.trim().is_empty());
        let image_empty = self.image_base64.as_deref().is_none_or(str::is_empty);
        text_empty && image_empty
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}
