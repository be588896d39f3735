//! Wire request builders
//!
//! Translates one dispatch attempt into the URL, headers, query and JSON body
//! of the target provider's protocol.

use serde_json::{Value, json};

use crate::defaults;
use crate::error::LlmError;
use crate::execution::{HttpHeaderBuilder, HttpRequestContext, HttpTransportRequest};
use crate::registry::{AuthStyle, ImageShape, PayloadShape, ProviderConfig};
use crate::types::{GenerationKind, ProviderId, ResponseMode};

/// Everything the dispatcher needs for one outbound call.
#[derive(Debug, Clone)]
pub struct DispatchAttempt {
    pub request_id: String,
    pub provider: ProviderId,
    pub kind: GenerationKind,
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub model: String,
    pub response_mode: ResponseMode,
}

/// Builds provider requests. Holds the few protocol knobs that are not part
/// of the static registry.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    pub anthropic_max_tokens: u32,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self {
            anthropic_max_tokens: defaults::anthropic::MAX_TOKENS,
        }
    }
}

impl RequestBuilder {
    pub fn build(
        &self,
        config: &ProviderConfig,
        attempt: &DispatchAttempt,
        api_key: &str,
    ) -> Result<HttpTransportRequest, LlmError> {
        let (url, body) = match attempt.kind {
            GenerationKind::Text => match config.payload {
                PayloadShape::ChatCompletions => (
                    format!("{}/chat/completions", config.base_url),
                    chat_completions_body(config, attempt),
                ),
                PayloadShape::GenerateContent => (
                    format!(
                        "{}/models/{}:generateContent",
                        config.base_url,
                        gemini_model_segment(&attempt.model)
                    ),
                    generate_content_body(attempt),
                ),
                PayloadShape::Messages => (
                    format!("{}/messages", config.base_url),
                    messages_body(attempt, self.anthropic_max_tokens),
                ),
            },
            GenerationKind::Image => match config.image {
                Some(ImageShape::Images) => (
                    format!("{}/images/generations", config.base_url),
                    images_body(config, attempt),
                ),
                Some(ImageShape::Imagen) => (
                    format!(
                        "{}/models/{}:predict",
                        config.base_url,
                        gemini_model_segment(&attempt.model)
                    ),
                    imagen_body(attempt),
                ),
                None => {
                    return Err(LlmError::InvalidInput(format!(
                        "provider {} does not support image generation",
                        config.id
                    )));
                }
            },
        };

        let mut headers = HttpHeaderBuilder::new().with_json_content_type();
        let mut query = Vec::new();
        match config.auth {
            AuthStyle::Bearer => headers = headers.with_bearer_auth(api_key)?,
            AuthStyle::Header(name) => headers = headers.with_custom_auth(name, api_key)?,
            AuthStyle::QueryParam(name) => query.push((name.to_string(), api_key.to_string())),
        }
        for (name, value) in &config.extra_headers {
            headers = headers.with_header(name, value)?;
        }

        Ok(HttpTransportRequest {
            ctx: HttpRequestContext {
                request_id: attempt.request_id.clone(),
                provider_id: config.id,
                url: url.clone(),
            },
            url,
            headers: headers.build(),
            query,
            body,
        })
    }
}

/// Gemini model path segment: `google/` gateway prefixes are dropped.
fn gemini_model_segment(model: &str) -> String {
    let model = model.trim();
    let model = model.strip_prefix("google/").unwrap_or(model);
    let model = model.strip_prefix("models/").unwrap_or(model);
    urlencoding::encode(model).into_owned()
}

fn wants_json(config: &ProviderConfig, attempt: &DispatchAttempt) -> bool {
    attempt.response_mode == ResponseMode::Json && config.supports_json_mode
}

fn chat_completions_body(config: &ProviderConfig, attempt: &DispatchAttempt) -> Value {
    let mut messages = Vec::new();
    if let Some(system) = attempt.system_prompt.as_deref() {
        messages.push(json!({ "role": "system", "content": system }));
    }
    messages.push(json!({ "role": "user", "content": attempt.prompt }));

    let mut body = json!({
        "model": attempt.model,
        "messages": messages,
    });
    if wants_json(config, attempt) {
        body["response_format"] = json!({ "type": "json_object" });
    }
    body
}

fn generate_content_body(attempt: &DispatchAttempt) -> Value {
    let mut body = json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": attempt.prompt }],
        }],
    });
    if let Some(system) = attempt.system_prompt.as_deref() {
        body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
    }
    if attempt.response_mode == ResponseMode::Json {
        body["generationConfig"] = json!({ "responseMimeType": "application/json" });
    }
    body
}

fn messages_body(attempt: &DispatchAttempt, max_tokens: u32) -> Value {
    let mut body = json!({
        "model": attempt.model,
        "max_tokens": max_tokens,
        "messages": [{ "role": "user", "content": attempt.prompt }],
    });
    if let Some(system) = attempt.system_prompt.as_deref() {
        body["system"] = json!(system);
    }
    body
}

fn image_prompt(attempt: &DispatchAttempt) -> String {
    match attempt.system_prompt.as_deref() {
        Some(system) if !system.trim().is_empty() => format!("{system}\n\n{}", attempt.prompt),
        _ => attempt.prompt.clone(),
    }
}

fn images_body(config: &ProviderConfig, attempt: &DispatchAttempt) -> Value {
    let mut body = json!({
        "model": attempt.model,
        "prompt": image_prompt(attempt),
        "size": defaults::image::SIZE,
    });
    if config.id == ProviderId::OpenAi {
        body["n"] = json!(1);
        body["response_format"] = json!("b64_json");
    }
    body
}

fn imagen_body(attempt: &DispatchAttempt) -> Value {
    json!({
        "instances": [{ "prompt": image_prompt(attempt) }],
        "parameters": { "sampleCount": 1 },
    })
}
