//! Model resolver
//!
//! Picks a provider id for a request. Explicit overrides win, then the model
//! name prefix, then the settings default, then the built-in default. The
//! function is pure and total.

use serde::{Deserialize, Serialize};

use crate::types::ProviderId;

/// Provider used when nothing else decides.
pub const DEFAULT_PROVIDER: ProviderId = ProviderId::Lovable;

/// Where `google/...` and bare `gemini-...` model names are routed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeminiRoute {
    /// Through the `lovable` gateway alias.
    #[default]
    Gateway,
    /// Straight to the Gemini API.
    Direct,
}

impl GeminiRoute {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "gateway" | "lovable" => Some(Self::Gateway),
            "direct" | "gemini" => Some(Self::Direct),
            _ => None,
        }
    }

    fn provider(&self) -> ProviderId {
        match self {
            Self::Gateway => ProviderId::Lovable,
            Self::Direct => ProviderId::Gemini,
        }
    }
}

/// Infer a provider from a model-name prefix.
pub fn infer_provider_from_model(model: &str, route: GeminiRoute) -> Option<ProviderId> {
    let model = model.trim();
    if model.is_empty() {
        return None;
    }
    let lower = model.to_ascii_lowercase();

    if lower.starts_with("glm-") || lower.starts_with("cogview") {
        return Some(ProviderId::Zai);
    }
    if lower.starts_with("gpt-") || lower.starts_with("dall-e") {
        return Some(ProviderId::OpenAi);
    }
    if lower.starts_with("claude-") {
        return Some(ProviderId::Anthropic);
    }
    if lower.starts_with("mistral-") || lower.starts_with("codestral") {
        return Some(ProviderId::Mistral);
    }
    if lower.starts_with("google/") || lower.starts_with("gemini-") {
        return Some(route.provider());
    }
    if lower.starts_with("imagen-") {
        return Some(ProviderId::Gemini);
    }
    None
}

/// [`infer_provider_from_model`] with the default Gemini route.
pub fn infer_provider_from_model_default(model: &str) -> Option<ProviderId> {
    infer_provider_from_model(model, GeminiRoute::default())
}

/// Resolve the provider for a request.
///
/// Unknown explicit overrides are ignored (logged at debug) so the function
/// stays total.
pub fn resolve_provider(
    explicit: Option<&str>,
    model: Option<&str>,
    settings_default: Option<ProviderId>,
    route: GeminiRoute,
) -> ProviderId {
    if let Some(raw) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
        match ProviderId::parse(raw) {
            Some(id) => return id,
            None => tracing::debug!(provider = raw, "ignoring unknown provider override"),
        }
    }
    model
        .and_then(|m| infer_provider_from_model(m, route))
        .or(settings_default)
        .unwrap_or(DEFAULT_PROVIDER)
}
