//! Generation gateway
//!
//! The single entry point callers use for text and image generation. Each
//! call reads the settings row, resolves credentials and the provider, walks
//! the fallback candidates, dispatches, and records one usage row per attempt.
//! Usage rows are written on detached tasks; [`Gateway::flush_usage`] waits
//! for the ones still in flight.
//!
//! ```rust,no_run
//! use genai_gateway::prelude::*;
//!
//! # async fn demo() -> Result<(), LlmError> {
//! let gateway = Gateway::builder().build()?;
//! let result = gateway
//!     .generate(GenerationRequest::text("Write a haiku").model("gpt-4o"))
//!     .await?;
//! println!("{} via {}", result.text_or_empty(), result.provider_used);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use crate::config::GatewayConfig;
use crate::credentials::{
    CredentialSet, EnvSource, GatewaySettings, ProcessEnv, SettingsStore, StaticSettings,
};
use crate::dispatch::{DispatchAttempt, RequestBuilder, RequestDispatcher};
use crate::error::LlmError;
use crate::execution::{HttpTransport, ReqwestTransport, generate_request_id};
use crate::fallback::no_image_provider;
use crate::registry::ProviderRegistry;
use crate::resolver::{infer_provider_from_model, resolve_provider};
use crate::types::{GenerationKind, GenerationRequest, GenerationResult, ProviderId};
use crate::usage::{TracingUsageRecorder, UsageLogEntry, UsageRecorder, record_usage};

pub struct Gateway {
    config: GatewayConfig,
    dispatcher: RequestDispatcher,
    settings: Arc<dyn SettingsStore>,
    recorder: Arc<dyn UsageRecorder>,
    env: Arc<dyn EnvSource>,
    usage_tasks: TaskTracker,
}

impl Gateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::default()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProviderRegistry {
        self.dispatcher.registry()
    }

    /// Wait until every usage row queued so far has been handed to the
    /// recorder. Call before shutdown, or before reading rows back.
    pub async fn flush_usage(&self) {
        self.usage_tasks.close();
        self.usage_tasks.wait().await;
        self.usage_tasks.reopen();
    }

    /// Generate text or an image. See [`Gateway::generate_with_cancel`].
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResult, LlmError> {
        self.generate_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Generate under the caller's cancellation token.
    ///
    /// Classification errors are returned as-is. An empty payload is not an
    /// error; check [`GenerationResult::is_empty`].
    pub async fn generate_with_cancel(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<GenerationResult, LlmError> {
        let request_id = generate_request_id();
        let span = tracing::info_span!(
            "generate",
            request_id = %request_id,
            operation = %request.operation,
            kind = request.kind.as_str(),
        );
        self.run(request_id, request, cancel).instrument(span).await
    }

    async fn run(
        &self,
        request_id: String,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<GenerationResult, LlmError> {
        let settings = self.settings.load().await?;
        let credentials = CredentialSet::resolve(&settings, self.env.as_ref());
        let kind = request.kind;

        let request_model = request
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty());
        let requested = resolve_provider(
            request.provider_override.as_deref(),
            request_model.or_else(|| settings.default_model(kind)),
            settings.default_provider(kind),
            self.config.gemini_route,
        );

        let policy = &self.config.fallback;
        let candidates = policy.candidates(kind, requested, &credentials, self.registry());
        if candidates.is_empty() {
            let err = no_image_provider(requested, &policy.image_chain);
            tracing::warn!(requested = %requested, "no image provider has a credential");
            return Err(err);
        }

        let mut last_err = None;
        for (index, provider) in candidates.iter().copied().enumerate() {
            let model = self.model_for(provider, requested, kind, request_model, &settings);
            if provider != requested {
                tracing::info!(requested = %requested, provider = %provider, model = %model, "falling back to another provider");
            }

            let mut metadata = request.metadata.clone();
            metadata.insert("request_id".into(), Value::from(request_id.as_str()));
            if provider != requested {
                metadata.insert("requested_provider".into(), Value::from(requested.as_str()));
            }

            let Some(api_key) = credentials.get(provider) else {
                let err = LlmError::MissingCredential {
                    provider: provider.to_string(),
                };
                let entry = UsageLogEntry::failure(
                    provider.as_str(),
                    &model,
                    request.operation.as_str(),
                    0,
                    &err,
                )
                .with_metadata(metadata);
                self.spawn_usage(entry);
                return Err(err);
            };

            let attempt = DispatchAttempt {
                request_id: request_id.clone(),
                provider,
                kind,
                system_prompt: request.system_prompt.clone(),
                prompt: request.prompt.clone(),
                model: model.clone(),
                response_mode: request.response_mode,
            };

            let started = Instant::now();
            let outcome = self.dispatcher.dispatch(&attempt, api_key, &cancel).await;
            let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            match outcome {
                Ok(output) => {
                    tracing::info!(provider = %provider, model = %model, duration_ms, tokens_used = ?output.tokens_used, "generation succeeded");
                    let entry = UsageLogEntry::success(
                        provider.as_str(),
                        &model,
                        request.operation.as_str(),
                        duration_ms,
                        output.tokens_used,
                    )
                    .with_metadata(metadata);
                    self.spawn_usage(entry);
                    return Ok(GenerationResult {
                        text: output.text,
                        image_base64: output.image_base64,
                        image_mime_type: output.image_mime_type,
                        provider_used: provider,
                        model_used: model,
                        duration_ms,
                        tokens_used: output.tokens_used,
                        success: true,
                    });
                }
                Err(err) => {
                    tracing::warn!(provider = %provider, model = %model, duration_ms, status = ?err.status_code(), error = %err, "generation attempt failed");
                    let entry = UsageLogEntry::failure(
                        provider.as_str(),
                        &model,
                        request.operation.as_str(),
                        duration_ms,
                        &err,
                    )
                    .with_metadata(metadata);
                    self.spawn_usage(entry);

                    let has_next = index + 1 < candidates.len();
                    if has_next && policy.should_advance(&err) {
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| no_image_provider(requested, &policy.image_chain)))
    }

    /// Queue one usage row. The caller never waits on the recorder.
    fn spawn_usage(&self, entry: UsageLogEntry) {
        let recorder = Arc::clone(&self.recorder);
        self.usage_tasks.spawn(
            async move { record_usage(recorder.as_ref(), entry).await }.in_current_span(),
        );
    }

    /// Model for one candidate.
    ///
    /// The request's model only goes to the requested provider. The settings
    /// default model goes to any candidate it belongs to: the provider its
    /// prefix names, or, for an unprefixed model, the settings default
    /// provider. Everything else gets the registry default for the kind.
    fn model_for(
        &self,
        provider: ProviderId,
        requested: ProviderId,
        kind: GenerationKind,
        request_model: Option<&str>,
        settings: &GatewaySettings,
    ) -> String {
        if provider == requested {
            if let Some(model) = request_model {
                return model.to_string();
            }
        }
        let settings_model = settings.default_model(kind).filter(|model| {
            match infer_provider_from_model(model, self.config.gemini_route) {
                Some(owner) => owner == provider,
                None => settings
                    .default_provider(kind)
                    .map_or(provider == requested, |default| default == provider),
            }
        });
        if let Some(model) = settings_model {
            return model.to_string();
        }
        self.registry()
            .get(provider)
            .and_then(|cfg| cfg.default_model_for(kind))
            .unwrap_or_default()
            .to_string()
    }
}

/// Builder for [`Gateway`]. Every collaborator has a production default.
#[derive(Default)]
pub struct GatewayBuilder {
    config: Option<GatewayConfig>,
    settings: Option<Arc<dyn SettingsStore>>,
    recorder: Option<Arc<dyn UsageRecorder>>,
    env: Option<Arc<dyn EnvSource>>,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl GatewayBuilder {
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Shorthand for a fixed in-memory settings row.
    pub fn static_settings(self, settings: GatewaySettings) -> Self {
        self.settings(Arc::new(StaticSettings(settings)))
    }

    pub fn recorder(mut self, recorder: Arc<dyn UsageRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn env(mut self, env: Arc<dyn EnvSource>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Gateway, LlmError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new(&config)?),
        };
        let builder = RequestBuilder {
            anthropic_max_tokens: config.anthropic_max_tokens,
        };
        let dispatcher =
            RequestDispatcher::new(config.registry(), transport, builder, config.request_timeout);

        Ok(Gateway {
            dispatcher,
            settings: self
                .settings
                .unwrap_or_else(|| Arc::new(StaticSettings::default())),
            recorder: self
                .recorder
                .unwrap_or_else(|| Arc::new(TracingUsageRecorder)),
            env: self.env.unwrap_or_else(|| Arc::new(ProcessEnv)),
            usage_tasks: TaskTracker::new(),
            config,
        })
    }
}
