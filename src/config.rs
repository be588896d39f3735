//! Gateway configuration.
//!
//! Process-level knobs (timeouts, base URLs, fallback policy). Credentials and
//! default models are not configured here; they come from the settings row on
//! every call.

use std::collections::HashMap;
use std::time::Duration;

use crate::credentials::{EnvSource, ProcessEnv};
use crate::defaults;
use crate::error::LlmError;
use crate::fallback::FallbackPolicy;
use crate::registry::ProviderRegistry;
use crate::resolver::GeminiRoute;
use crate::types::ProviderId;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Bound on one dispatch attempt, from send to normalized payload.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub base_urls: HashMap<ProviderId, String>,
    pub fallback: FallbackPolicy,
    pub gemini_route: GeminiRoute,
    pub anthropic_max_tokens: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_timeout: defaults::http::REQUEST_TIMEOUT,
            connect_timeout: defaults::http::CONNECT_TIMEOUT,
            user_agent: defaults::http::USER_AGENT.to_string(),
            base_urls: HashMap::new(),
            fallback: FallbackPolicy::default(),
            gemini_route: GeminiRoute::default(),
            anthropic_max_tokens: defaults::anthropic::MAX_TOKENS,
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_env_source(&ProcessEnv)
    }

    /// Read overrides from an arbitrary environment source.
    ///
    /// Recognized variables: `GATEWAY_REQUEST_TIMEOUT_SECS`,
    /// `GATEWAY_CONNECT_TIMEOUT_SECS`, `GATEWAY_GEMINI_ROUTE`,
    /// `GATEWAY_TEXT_FALLBACK`, `GATEWAY_ADVANCE_ON_FAILURE` and
    /// `<PROVIDER>_BASE_URL`. Advancing after a failed attempt applies to
    /// every chain, so it covers the text chain when that is enabled.
    pub fn from_env_source(env: &dyn EnvSource) -> Result<Self, LlmError> {
        let mut cfg = Self::default();

        if let Some(secs) = parse_env::<u64>(env, "GATEWAY_REQUEST_TIMEOUT_SECS")? {
            cfg.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env::<u64>(env, "GATEWAY_CONNECT_TIMEOUT_SECS")? {
            cfg.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = env.var("GATEWAY_GEMINI_ROUTE") {
            cfg.gemini_route = GeminiRoute::parse(&raw).ok_or_else(|| {
                LlmError::ConfigurationError(format!("GATEWAY_GEMINI_ROUTE: unknown route {raw}"))
            })?;
        }
        if let Some(flag) = parse_env::<bool>(env, "GATEWAY_TEXT_FALLBACK")? {
            cfg.fallback.text_enabled = flag;
        }
        if let Some(flag) = parse_env::<bool>(env, "GATEWAY_ADVANCE_ON_FAILURE")? {
            cfg.fallback.advance_on_failure = flag;
        }
        for id in ProviderId::ALL {
            if let Some(url) = env.var(id.base_url_env_var()).filter(|u| !u.trim().is_empty()) {
                cfg.base_urls.insert(id, url.trim().to_string());
            }
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_base_url(mut self, id: ProviderId, url: impl Into<String>) -> Self {
        self.base_urls.insert(id, url.into());
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_gemini_route(mut self, route: GeminiRoute) -> Self {
        self.gemini_route = route;
        self
    }

    pub fn validate(&self) -> Result<(), LlmError> {
        if self.request_timeout.is_zero() {
            return Err(LlmError::ConfigurationError(
                "request timeout must be greater than zero".into(),
            ));
        }
        if self.anthropic_max_tokens == 0 {
            return Err(LlmError::ConfigurationError(
                "anthropic max tokens must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Built-in registry with this config's base-URL overrides applied.
    pub fn registry(&self) -> ProviderRegistry {
        let mut registry = ProviderRegistry::builtin();
        for (id, url) in &self.base_urls {
            registry.set_base_url(*id, url.clone());
        }
        registry
    }
}

fn parse_env<T: std::str::FromStr>(env: &dyn EnvSource, name: &str) -> Result<Option<T>, LlmError>
where
    T::Err: std::fmt::Display,
{
    match env.var(name) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| LlmError::ConfigurationError(format!("{name}: {e}"))),
    }
}
