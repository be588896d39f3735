//! Provider registry
//!
//! Static catalog of per-provider wire contracts: where to send a request,
//! how to authenticate, which envelope to speak and what each provider
//! supports. Base URLs can be overridden per gateway instance (tests point
//! them at mock servers).

use std::collections::HashMap;

use crate::defaults::{base_urls, models};
use crate::error::LlmError;
use crate::types::{GenerationKind, ProviderId};

/// How a provider expects its API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// API key in a query parameter, e.g. `?key=<key>`
    QueryParam(&'static str),
    /// API key in a custom header, e.g. `x-api-key: <key>`
    Header(&'static str),
}

/// Request/response envelope for text generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// OpenAI `/chat/completions`
    ChatCompletions,
    /// Google `models/{model}:generateContent`
    GenerateContent,
    /// Anthropic `/messages`
    Messages,
}

/// Request/response envelope for image generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageShape {
    /// OpenAI-style `/images/generations`
    Images,
    /// Google Imagen `models/{model}:predict`
    Imagen,
}

/// Wire contract of one provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub id: ProviderId,
    pub base_url: String,
    pub auth: AuthStyle,
    pub payload: PayloadShape,
    /// `None` when the provider cannot generate images directly.
    pub image: Option<ImageShape>,
    /// Whether the provider honors an explicit JSON output mode.
    pub supports_json_mode: bool,
    pub default_model: &'static str,
    pub default_image_model: Option<&'static str>,
    /// Static headers sent with every request.
    pub extra_headers: Vec<(&'static str, &'static str)>,
}

impl ProviderConfig {
    pub fn supports_images(&self) -> bool {
        self.image.is_some()
    }

    /// Default model for the given kind, if the provider supports that kind.
    pub fn default_model_for(&self, kind: GenerationKind) -> Option<&'static str> {
        match kind {
            GenerationKind::Text => Some(self.default_model),
            GenerationKind::Image => self.default_image_model,
        }
    }

    fn openai_compatible(id: ProviderId, base_url: &str, default_model: &'static str) -> Self {
        Self {
            id,
            base_url: base_url.to_string(),
            auth: AuthStyle::Bearer,
            payload: PayloadShape::ChatCompletions,
            image: None,
            supports_json_mode: true,
            default_model,
            default_image_model: None,
            extra_headers: Vec::new(),
        }
    }

    fn gemini(id: ProviderId) -> Self {
        Self {
            id,
            base_url: base_urls::GEMINI.to_string(),
            auth: AuthStyle::QueryParam("key"),
            payload: PayloadShape::GenerateContent,
            image: Some(ImageShape::Imagen),
            supports_json_mode: true,
            default_model: models::GEMINI_TEXT,
            default_image_model: Some(models::GEMINI_IMAGE),
            extra_headers: Vec::new(),
        }
    }
}

/// Registry of all known providers.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    by_id: HashMap<ProviderId, ProviderConfig>,
}

impl ProviderRegistry {
    /// Built-in catalog with production base URLs.
    pub fn builtin() -> Self {
        let mut by_id = HashMap::new();

        by_id.insert(
            ProviderId::Lovable,
            ProviderConfig::openai_compatible(
                ProviderId::Lovable,
                base_urls::LOVABLE,
                models::LOVABLE_TEXT,
            ),
        );

        let mut openai = ProviderConfig::openai_compatible(
            ProviderId::OpenAi,
            base_urls::OPENAI,
            models::OPENAI_TEXT,
        );
        openai.image = Some(ImageShape::Images);
        openai.default_image_model = Some(models::OPENAI_IMAGE);
        by_id.insert(ProviderId::OpenAi, openai);

        by_id.insert(ProviderId::Gemini, ProviderConfig::gemini(ProviderId::Gemini));
        by_id.insert(
            ProviderId::GeminiV22,
            ProviderConfig::gemini(ProviderId::GeminiV22),
        );

        by_id.insert(
            ProviderId::Anthropic,
            ProviderConfig {
                id: ProviderId::Anthropic,
                base_url: base_urls::ANTHROPIC.to_string(),
                auth: AuthStyle::Header("x-api-key"),
                payload: PayloadShape::Messages,
                image: None,
                supports_json_mode: false,
                default_model: models::ANTHROPIC_TEXT,
                default_image_model: None,
                extra_headers: vec![(
                    "anthropic-version",
                    crate::defaults::anthropic::API_VERSION,
                )],
            },
        );

        let mut zai =
            ProviderConfig::openai_compatible(ProviderId::Zai, base_urls::ZAI, models::ZAI_TEXT);
        zai.image = Some(ImageShape::Images);
        zai.default_image_model = Some(models::ZAI_IMAGE);
        by_id.insert(ProviderId::Zai, zai);

        let mut mistral = ProviderConfig::openai_compatible(
            ProviderId::Mistral,
            base_urls::MISTRAL,
            models::MISTRAL_TEXT,
        );
        mistral.supports_json_mode = false;
        by_id.insert(ProviderId::Mistral, mistral);

        Self { by_id }
    }

    /// Override one provider's base URL. Trailing slashes are trimmed.
    pub fn with_base_url(mut self, id: ProviderId, base_url: impl Into<String>) -> Self {
        self.set_base_url(id, base_url);
        self
    }

    pub fn set_base_url(&mut self, id: ProviderId, base_url: impl Into<String>) {
        if let Some(cfg) = self.by_id.get_mut(&id) {
            cfg.base_url = base_url.into().trim_end_matches('/').to_string();
        }
    }

    pub fn get(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.by_id.get(&id)
    }

    /// Like [`get`](Self::get), but an unregistered id is a configuration error.
    pub fn config(&self, id: ProviderId) -> Result<&ProviderConfig, LlmError> {
        self.get(id).ok_or_else(|| {
            LlmError::ConfigurationError(format!("Provider {id} is not registered"))
        })
    }

    pub fn supports_images(&self, id: ProviderId) -> bool {
        self.get(id).is_some_and(ProviderConfig::supports_images)
    }

    /// List registered providers in declaration order.
    pub fn list(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|id| self.by_id.contains_key(id))
            .collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
