//! Shared helpers for gateway integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use genai_gateway::prelude::*;
use serde_json::{Value, json};
use wiremock::MockServer;

/// Smallest valid PNG header, enough for MIME sniffing.
pub const PNG_BYTES: [u8; 12] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

pub fn png_base64() -> String {
    base64::engine::general_purpose::STANDARD.encode(PNG_BYTES)
}

/// Config with every provider routed to `{server}/{provider}`.
pub fn mock_config(server: &MockServer) -> GatewayConfig {
    ProviderId::ALL
        .into_iter()
        .fold(GatewayConfig::default(), |cfg, id| {
            cfg.with_base_url(id, format!("{}/{}", server.uri(), id.as_str()))
        })
        .with_request_timeout(Duration::from_secs(5))
}

pub fn gateway(
    config: GatewayConfig,
    settings: GatewaySettings,
    env: MapEnv,
    recorder: &MemoryUsageRecorder,
) -> Gateway {
    Gateway::builder()
        .config(config)
        .static_settings(settings)
        .env(Arc::new(env))
        .recorder(Arc::new(recorder.clone()))
        .build()
        .expect("gateway builds")
}

pub fn chat_response(content: &str) -> Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-4o",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 9, "completion_tokens": 12, "total_tokens": 21 }
    })
}

pub fn gemini_response(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }], "role": "model" },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "promptTokenCount": 5, "candidatesTokenCount": 10, "totalTokenCount": 15 },
        "modelVersion": "gemini-2.5-flash"
    })
}

pub fn anthropic_response(text: &str) -> Value {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "model": "claude-sonnet-4-20250514",
        "content": [{ "type": "text", "text": text }],
        "stop_reason": "end_turn",
        "usage": { "input_tokens": 10, "output_tokens": 20 }
    })
}

pub fn imagen_response(b64: &str) -> Value {
    json!({ "predictions": [{ "bytesBase64Encoded": b64, "mimeType": "image/png" }] })
}

pub fn images_b64_response(b64: &str) -> Value {
    json!({ "created": 1_700_000_000, "data": [{ "b64_json": b64 }] })
}
