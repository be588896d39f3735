//! Settings snapshot and credential resolution.
//!
//! The gateway reads a [`GatewaySettings`] snapshot fresh on every call and
//! derives a [`CredentialSet`] from it: a non-blank settings value wins,
//! otherwise the same provider's environment variable is used.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::types::{GenerationKind, ProviderId};

/// Persisted admin settings row.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(default)]
pub struct GatewaySettings {
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_v22_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub zai_api_key: Option<String>,
    pub mistral_api_key: Option<String>,
    pub default_text_provider: Option<String>,
    pub default_text_model: Option<String>,
    pub default_image_provider: Option<String>,
    pub default_image_model: Option<String>,
}

impl GatewaySettings {
    /// Stored key for a provider. `lovable` has no settings column.
    pub fn api_key(&self, id: ProviderId) -> Option<&str> {
        let key = match id {
            ProviderId::Lovable => None,
            ProviderId::OpenAi => self.openai_api_key.as_deref(),
            ProviderId::Gemini => self.gemini_api_key.as_deref(),
            ProviderId::GeminiV22 => self.gemini_v22_api_key.as_deref(),
            ProviderId::Anthropic => self.anthropic_api_key.as_deref(),
            ProviderId::Zai => self.zai_api_key.as_deref(),
            ProviderId::Mistral => self.mistral_api_key.as_deref(),
        };
        key.map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn default_provider(&self, kind: GenerationKind) -> Option<ProviderId> {
        let raw = match kind {
            GenerationKind::Text => self.default_text_provider.as_deref(),
            GenerationKind::Image => self.default_image_provider.as_deref(),
        };
        raw.and_then(ProviderId::parse)
    }

    pub fn default_model(&self, kind: GenerationKind) -> Option<&str> {
        let raw = match kind {
            GenerationKind::Text => self.default_text_model.as_deref(),
            GenerationKind::Image => self.default_image_model.as_deref(),
        };
        raw.map(str::trim).filter(|m| !m.is_empty())
    }
}

impl fmt::Debug for GatewaySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let configured: Vec<&str> = ProviderId::ALL
            .iter()
            .filter(|id| self.api_key(**id).is_some())
            .map(|id| id.as_str())
            .collect();
        f.debug_struct("GatewaySettings")
            .field("configured_keys", &configured)
            .field("default_text_provider", &self.default_text_provider)
            .field("default_text_model", &self.default_text_model)
            .field("default_image_provider", &self.default_image_provider)
            .field("default_image_model", &self.default_image_model)
            .finish()
    }
}

/// Source of the settings row, read once per gateway invocation.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<GatewaySettings, LlmError>;
}

/// Fixed in-memory settings.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings(pub GatewaySettings);

#[async_trait]
impl SettingsStore for StaticSettings {
    async fn load(&self) -> Result<GatewaySettings, LlmError> {
        Ok(self.0.clone())
    }
}

/// Read access to environment variables.
pub trait EnvSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// A fixed map of variables.
#[derive(Debug, Clone, Default)]
pub struct MapEnv(pub HashMap<String, String>);

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

/// One API key per provider, resolved settings-first then environment.
#[derive(Default)]
pub struct CredentialSet {
    keys: HashMap<ProviderId, SecretString>,
}

impl CredentialSet {
    pub fn resolve(settings: &GatewaySettings, env: &dyn EnvSource) -> Self {
        let mut keys = HashMap::new();
        for id in ProviderId::ALL {
            let key = settings.api_key(id).map(str::to_string).or_else(|| {
                env.var(id.env_var())
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
            });
            if let Some(key) = key {
                keys.insert(id, SecretString::from(key));
            }
        }
        Self { keys }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, id: ProviderId, key: impl Into<String>) -> Self {
        self.keys.insert(id, SecretString::from(key.into()));
        self
    }

    pub fn get(&self, id: ProviderId) -> Option<&SecretString> {
        self.keys.get(&id)
    }

    pub fn has(&self, id: ProviderId) -> bool {
        self.keys
            .get(&id)
            .is_some_and(|k| !k.expose_secret().is_empty())
    }

    pub fn configured(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|id| self.has(*id))
            .collect()
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("configured", &self.configured())
            .finish()
    }
}
