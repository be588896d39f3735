//! Request dispatcher
//!
//! Performs exactly one outbound HTTP call per attempt using the registry's
//! wire contract, then either normalizes the 2xx body or classifies the
//! failure. Each attempt is bounded by the configured timeout and aborts as
//! soon as the caller's cancellation token fires.

mod errors;
mod request;

pub use errors::classify_http_error;
pub use request::{DispatchAttempt, RequestBuilder};

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;

use crate::error::LlmError;
use crate::execution::HttpTransport;
use crate::normalize::{self, ImagePayload};
use crate::registry::{ProviderConfig, ProviderRegistry};
use crate::types::GenerationKind;

/// Normalized payload of one successful attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutput {
    pub text: Option<String>,
    pub image_base64: Option<String>,
    pub image_mime_type: Option<String>,
    pub tokens_used: Option<u64>,
}

pub struct RequestDispatcher {
    registry: ProviderRegistry,
    transport: Arc<dyn HttpTransport>,
    builder: RequestBuilder,
    timeout: Duration,
}

impl RequestDispatcher {
    pub fn new(
        registry: ProviderRegistry,
        transport: Arc<dyn HttpTransport>,
        builder: RequestBuilder,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            transport,
            builder,
            timeout,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Run one attempt under the timeout and the caller's cancellation.
    pub async fn dispatch(
        &self,
        attempt: &DispatchAttempt,
        api_key: &SecretString,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutput, LlmError> {
        let provider = attempt.provider;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LlmError::Cancelled(format!(
                "provider={provider} request cancelled by caller"
            ))),
            res = tokio::time::timeout(self.timeout, self.execute(attempt, api_key)) => {
                res.unwrap_or_else(|_| Err(LlmError::TimeoutError(format!(
                    "provider={provider} no response within {}s",
                    self.timeout.as_secs_f32()
                ))))
            }
        }
    }

    async fn execute(
        &self,
        attempt: &DispatchAttempt,
        api_key: &SecretString,
    ) -> Result<DispatchOutput, LlmError> {
        let config = self.registry.config(attempt.provider)?;
        let request = self
            .builder
            .build(config, attempt, api_key.expose_secret())?;

        tracing::debug!(
            request_id = %attempt.request_id,
            provider = %attempt.provider,
            model = %attempt.model,
            url = %request.ctx.url,
            "dispatching provider request"
        );

        let response = self.transport.execute_json(request).await?;
        if !response.is_success() {
            let body = response.text();
            return Err(classify_http_error(
                attempt.provider,
                response.status,
                &body,
                &response.headers,
            ));
        }

        match attempt.kind {
            GenerationKind::Text => {
                let normalized = normalize::normalize_text(config.payload, &response.body);
                Ok(DispatchOutput {
                    text: Some(normalized.text),
                    tokens_used: normalized.tokens_used,
                    ..Default::default()
                })
            }
            GenerationKind::Image => self.image_output(config, &response.body).await,
        }
    }

    async fn image_output(
        &self,
        config: &ProviderConfig,
        body: &[u8],
    ) -> Result<DispatchOutput, LlmError> {
        let Some(shape) = config.image else {
            return Ok(DispatchOutput::default());
        };
        let b64 = match normalize::normalize_image(shape, body) {
            ImagePayload::Base64(b64) => b64,
            ImagePayload::Url(url) => self.download_image(config, &url).await?,
            ImagePayload::Empty => String::new(),
        };
        let mime = (!b64.is_empty()).then(|| normalize::sniff_image_mime(&b64));
        Ok(DispatchOutput {
            image_base64: Some(b64),
            image_mime_type: mime,
            ..Default::default()
        })
    }

    /// Some providers (Z.AI) answer with a hosted URL instead of inline bytes.
    async fn download_image(&self, config: &ProviderConfig, url: &str) -> Result<String, LlmError> {
        tracing::debug!(provider = %config.id, "downloading hosted image");
        let response = self.transport.fetch_bytes(url).await?;
        if !response.is_success() {
            return Err(LlmError::provider_error(
                config.id.as_str(),
                response.status,
                &format!("image download failed: {}", response.text()),
            ));
        }
        Ok(normalize::encode_image_bytes(&response.body))
    }
}
