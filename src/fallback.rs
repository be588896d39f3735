//! Fallback policy
//!
//! Decides which provider actually serves a request when the requested one
//! has no usable credential. Images fall back by default; text fallback is
//! opt-in so that a misconfigured text provider surfaces as an error instead
//! of silently switching vendors.

use serde::{Deserialize, Serialize};

use crate::credentials::CredentialSet;
use crate::error::LlmError;
use crate::registry::ProviderRegistry;
use crate::types::{GenerationKind, ProviderId};

/// Preference order after the requested provider, for images.
pub const IMAGE_FALLBACK_CHAIN: [ProviderId; 3] =
    [ProviderId::Gemini, ProviderId::OpenAi, ProviderId::Zai];

/// Preference order after the requested provider, for text (when enabled).
pub const TEXT_FALLBACK_CHAIN: [ProviderId; 5] = [
    ProviderId::Gemini,
    ProviderId::OpenAi,
    ProviderId::Anthropic,
    ProviderId::Zai,
    ProviderId::Mistral,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackPolicy {
    pub image_chain: Vec<ProviderId>,
    pub text_chain: Vec<ProviderId>,
    /// Walk `text_chain` when the requested text provider has no credential.
    pub text_enabled: bool,
    /// Try the next candidate after an authentication failure or a 5xx.
    pub advance_on_failure: bool,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            image_chain: IMAGE_FALLBACK_CHAIN.to_vec(),
            text_chain: TEXT_FALLBACK_CHAIN.to_vec(),
            text_enabled: false,
            advance_on_failure: false,
        }
    }
}

impl FallbackPolicy {
    pub fn with_text_fallback(mut self, enabled: bool) -> Self {
        self.text_enabled = enabled;
        self
    }

    pub fn with_advance_on_failure(mut self, enabled: bool) -> Self {
        self.advance_on_failure = enabled;
        self
    }

    /// Ordered providers to attempt for a request.
    ///
    /// For images, the list holds only image-capable providers with a
    /// credential and may be empty. For text without fallback, it is always
    /// exactly the requested provider, credentialed or not.
    pub fn candidates(
        &self,
        kind: GenerationKind,
        requested: ProviderId,
        credentials: &CredentialSet,
        registry: &ProviderRegistry,
    ) -> Vec<ProviderId> {
        match kind {
            GenerationKind::Image => {
                let usable = |id: ProviderId| registry.supports_images(id) && credentials.has(id);
                walk(requested, &self.image_chain, usable)
            }
            GenerationKind::Text if !self.text_enabled => vec![requested],
            GenerationKind::Text => {
                let usable = |id: ProviderId| registry.get(id).is_some() && credentials.has(id);
                let chain = walk(requested, &self.text_chain, usable);
                if chain.is_empty() {
                    vec![requested]
                } else {
                    chain
                }
            }
        }
    }

    /// First usable image provider for `requested`.
    pub fn select_image_provider(
        &self,
        requested: ProviderId,
        credentials: &CredentialSet,
        registry: &ProviderRegistry,
    ) -> Result<ProviderId, LlmError> {
        self.candidates(GenerationKind::Image, requested, credentials, registry)
            .into_iter()
            .next()
            .ok_or_else(|| no_image_provider(requested, &self.image_chain))
    }

    /// Whether a failed attempt should move on to the next candidate.
    pub fn should_advance(&self, err: &LlmError) -> bool {
        if !self.advance_on_failure {
            return false;
        }
        match err {
            LlmError::AuthenticationError { .. } | LlmError::MissingCredential { .. } => true,
            LlmError::ProviderError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// [`FallbackPolicy::select_image_provider`] with the default chain.
pub fn select_image_provider(
    requested: ProviderId,
    credentials: &CredentialSet,
    registry: &ProviderRegistry,
) -> Result<ProviderId, LlmError> {
    FallbackPolicy::default().select_image_provider(requested, credentials, registry)
}

pub(crate) fn no_image_provider(requested: ProviderId, chain: &[ProviderId]) -> LlmError {
    let tried: Vec<&str> = std::iter::once(requested)
        .chain(chain.iter().copied())
        .map(|id| id.as_str())
        .collect();
    LlmError::NoProviderAvailable(format!(
        "no image provider has a configured API key (checked: {})",
        tried.join(", ")
    ))
}

fn walk(
    requested: ProviderId,
    chain: &[ProviderId],
    usable: impl Fn(ProviderId) -> bool,
) -> Vec<ProviderId> {
    let mut out = Vec::new();
    for id in std::iter::once(requested).chain(chain.iter().copied()) {
        if out.contains(&id) {
            continue;
        }
        if usable(id) {
            out.push(id);
        } else {
            tracing::debug!(provider = %id, "skipping fallback candidate without credential");
        }
    }
    out
}
