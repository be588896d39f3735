//! End-to-end gateway tests against wiremock provider endpoints.
//!
//! Every provider's base URL points at `{mock}/{provider}`, so each test can
//! assert exactly which vendor endpoint was hit and how often.

mod support;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use genai_gateway::prelude::*;
use serde_json::json;
use support::*;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn scenario_a_openai_text_with_inferred_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("Hello from OpenAI")))
        .expect(1)
        .mount(&server)
        .await;

    let recorder = MemoryUsageRecorder::new();
    let settings = GatewaySettings {
        openai_api_key: Some("sk-test".into()),
        ..Default::default()
    };
    let gw = gateway(mock_config(&server), settings, MapEnv::new(), &recorder);

    let result = gw
        .generate(
            GenerationRequest::text("X")
                .model("gpt-4o")
                .entity("article_id", 42),
        )
        .await
        .unwrap();

    assert_eq!(result.text.as_deref(), Some("Hello from OpenAI"));
    assert_eq!(result.provider_used, ProviderId::OpenAi);
    assert_eq!(result.model_used, "gpt-4o");
    assert_eq!(result.tokens_used, Some(21));
    assert!(result.success);

    gw.flush_usage().await;
    let rows = recorder.entries();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].provider, "openai");
    assert!(rows[0].success);
    assert_eq!(rows[0].tokens_used, Some(21));
    assert_eq!(rows[0].operation, "generate-text");
    assert_eq!(rows[0].metadata["article_id"], json!(42));
}

#[tokio::test]
async fn scenario_b_image_falls_back_to_gemini_imagen() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(images_b64_response("unused")))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/gemini/models/imagen-3.0-generate-002:predict"))
        .and(query_param("key", "g-test"))
        .and(body_partial_json(json!({ "instances": [{ "prompt": "Y" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(imagen_response(&png_base64())))
        .expect(1)
        .mount(&server)
        .await;

    let recorder = MemoryUsageRecorder::new();
    let settings = GatewaySettings {
        gemini_api_key: Some("g-test".into()),
        openai_api_key: Some("   ".into()),
        ..Default::default()
    };
    let gw = gateway(mock_config(&server), settings, MapEnv::new(), &recorder);

    let result = gw
        .generate(GenerationRequest::image("Y").provider("openai"))
        .await
        .unwrap();

    assert_eq!(result.provider_used, ProviderId::Gemini);
    assert_eq!(result.model_used, "imagen-3.0-generate-002");
    assert_eq!(result.image_base64.as_deref(), Some(png_base64().as_str()));
    assert_eq!(result.image_mime_type.as_deref(), Some("image/png"));

    gw.flush_usage().await;
    let rows = recorder.entries();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].provider, "gemini");
    assert_eq!(rows[0].operation, "generate-image");
    assert_eq!(rows[0].metadata["requested_provider"], json!("openai"));
}

#[tokio::test]
async fn scenario_c_glm_model_payment_required() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/zai/chat/completions"))
        .and(body_partial_json(json!({ "model": "GLM-4.7" })))
        .respond_with(
            ResponseTemplate::new(402)
                .set_body_json(json!({ "error": { "code": "1113", "message": "Insufficient balance" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let recorder = MemoryUsageRecorder::new();
    let gw = gateway(
        mock_config(&server),
        GatewaySettings::default(),
        MapEnv::new().with("ZAI_API_KEY", "z-env"),
        &recorder,
    );

    let err = gw
        .generate(GenerationRequest::for_operation(Operation::Retell, "Retell this").model("GLM-4.7"))
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::PaymentRequired(_)));
    assert_eq!(
        err.user_message(),
        "Payment required. Please add credits to your AI provider account."
    );

    gw.flush_usage().await;
    let rows = recorder.entries();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].success);
    assert_eq!(rows[0].provider, "zai");
    assert_eq!(rows[0].model, "GLM-4.7");
    assert_eq!(rows[0].operation, "retell");
    assert!(rows[0].error_message.as_deref().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn scenario_d_fenced_dialogue_parses_like_bare_json() {
    let bare = r#"{"dialogue":[{"speaker":"A","text":"Hola"},{"speaker":"B","text":"¿Qué tal?"}]}"#;
    let fenced = format!("```json\n{bare}\n```");

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/chat/completions"))
        .and(body_partial_json(json!({ "response_format": { "type": "json_object" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(&fenced)))
        .expect(1)
        .mount(&server)
        .await;

    let recorder = MemoryUsageRecorder::new();
    let settings = GatewaySettings {
        openai_api_key: Some("sk-test".into()),
        ..Default::default()
    };
    let gw = gateway(mock_config(&server), settings, MapEnv::new(), &recorder);

    let result = gw
        .generate(
            GenerationRequest::for_operation(Operation::GenerateDialogue, "Two friends meet")
                .system_prompt("Answer in Spanish as JSON.")
                .model("gpt-4o-mini"),
        )
        .await
        .unwrap();

    let shape = ShapeDescriptor::dialogue();
    let from_model = parse_structured(result.text_or_empty(), &shape).unwrap();
    let expected = parse_structured(bare, &shape).unwrap();
    assert_eq!(from_model, expected);
    assert_eq!(from_model.array("dialogue").len(), 2);
    gw.flush_usage().await;
    assert_eq!(recorder.entries()[0].operation, "generate-dialogue");
}

#[tokio::test]
async fn status_codes_are_classified_with_one_failed_row_each() {
    let cases: [(u16, fn(&LlmError) -> bool); 4] = [
        (429, |e| matches!(e, LlmError::RateLimitError(_))),
        (402, |e| matches!(e, LlmError::PaymentRequired(_))),
        (401, |e| matches!(e, LlmError::AuthenticationError { status: 401, .. })),
        (500, |e| matches!(e, LlmError::ProviderError { status: 500, .. })),
    ];

    for (status, is_expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/anthropic/messages"))
            .and(header("x-api-key", "a-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({
                    "type": "error",
                    "error": { "type": "api_error", "message": "x".repeat(3000) }
                })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let recorder = MemoryUsageRecorder::new();
        let settings = GatewaySettings {
            anthropic_api_key: Some("a-test".into()),
            ..Default::default()
        };
        let gw = gateway(mock_config(&server), settings, MapEnv::new(), &recorder);

        let err = gw
            .generate(GenerationRequest::text("hi").model("claude-sonnet-4-20250514"))
            .await
            .unwrap_err();
        assert!(is_expected(&err), "status {status} gave {err:?}");

        gw.flush_usage().await;
        let rows = recorder.entries();
        assert_eq!(rows.len(), 1, "status {status}");
        assert!(!rows[0].success);
        let message = rows[0].error_message.clone().unwrap_or_default();
        assert!(!message.is_empty());
        assert!(message.chars().count() <= 1000);

        server.verify().await;
    }
}

#[tokio::test]
async fn gemini_prefix_routes_to_gateway_alias_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/lovable/chat/completions"))
        .and(header("authorization", "Bearer lv-key"))
        .and(body_partial_json(json!({ "model": "google/gemini-2.5-flash" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("via gateway")))
        .expect(1)
        .mount(&server)
        .await;

    let recorder = MemoryUsageRecorder::new();
    let gw = gateway(
        mock_config(&server),
        GatewaySettings::default(),
        MapEnv::new().with("LOVABLE_API_KEY", "lv-key"),
        &recorder,
    );

    let result = gw
        .generate(GenerationRequest::text("hi").model("google/gemini-2.5-flash"))
        .await
        .unwrap();
    assert_eq!(result.provider_used, ProviderId::Lovable);
    assert_eq!(result.text_or_empty(), "via gateway");
}

#[tokio::test]
async fn gemini_direct_route_uses_query_key_and_strips_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gemini/models/gemini-2.5-flash:generateContent"))
        .and(query_param("key", "g-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_response("direct gemini")))
        .expect(1)
        .mount(&server)
        .await;

    let recorder = MemoryUsageRecorder::new();
    let settings = GatewaySettings {
        gemini_api_key: Some("g-test".into()),
        ..Default::default()
    };
    let config = mock_config(&server).with_gemini_route(GeminiRoute::Direct);
    let gw = gateway(config, settings, MapEnv::new(), &recorder);

    let result = gw
        .generate(GenerationRequest::text("hi").model("google/gemini-2.5-flash"))
        .await
        .unwrap();
    assert_eq!(result.provider_used, ProviderId::Gemini);
    assert_eq!(result.text_or_empty(), "direct gemini");
    assert_eq!(result.tokens_used, Some(15));
}

#[tokio::test]
async fn anthropic_text_uses_first_text_block() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/anthropic/messages"))
        .and(body_partial_json(json!({ "system": "Be brief." })))
        .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_response("Brief.")))
        .expect(1)
        .mount(&server)
        .await;

    let recorder = MemoryUsageRecorder::new();
    let settings = GatewaySettings {
        anthropic_api_key: Some("a-test".into()),
        ..Default::default()
    };
    let gw = gateway(mock_config(&server), settings, MapEnv::new(), &recorder);

    let result = gw
        .generate(
            GenerationRequest::text("Summarize")
                .system_prompt("Be brief.")
                .provider("claude"),
        )
        .await
        .unwrap();
    assert_eq!(result.text_or_empty(), "Brief.");
    assert_eq!(result.model_used, "claude-sonnet-4-20250514");
    assert_eq!(result.tokens_used, Some(30));
}

#[tokio::test]
async fn zai_hosted_image_is_downloaded() {
    let server = MockServer::start().await;
    let image_url = format!("{}/files/cat.png", server.uri());
    Mock::given(method("POST"))
        .and(path("/zai/images/generations"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "created": 1, "data": [{ "url": image_url }] })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/cat.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG_BYTES.to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let recorder = MemoryUsageRecorder::new();
    let settings = GatewaySettings {
        zai_api_key: Some("z-test".into()),
        ..Default::default()
    };
    let gw = gateway(mock_config(&server), settings, MapEnv::new(), &recorder);

    let result = gw
        .generate(GenerationRequest::image("a cat").provider("zai"))
        .await
        .unwrap();
    assert_eq!(result.provider_used, ProviderId::Zai);
    assert_eq!(result.model_used, "cogview-4");
    assert_eq!(result.image_base64.as_deref(), Some(png_base64().as_str()));
    assert_eq!(result.image_mime_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn empty_payload_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mistral/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let recorder = MemoryUsageRecorder::new();
    let settings = GatewaySettings {
        mistral_api_key: Some("m-test".into()),
        ..Default::default()
    };
    let gw = gateway(mock_config(&server), settings, MapEnv::new(), &recorder);

    let result = gw
        .generate(GenerationRequest::text("hi").model("mistral-large-latest"))
        .await
        .unwrap();
    assert!(result.is_empty());
    assert!(result.success);
    gw.flush_usage().await;
    assert!(recorder.entries()[0].success);
}

#[tokio::test]
async fn slow_provider_times_out_and_is_logged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_response("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let recorder = MemoryUsageRecorder::new();
    let settings = GatewaySettings {
        openai_api_key: Some("sk-test".into()),
        ..Default::default()
    };
    let config = mock_config(&server).with_request_timeout(Duration::from_millis(150));
    let gw = gateway(config, settings, MapEnv::new(), &recorder);

    let err = gw
        .generate(GenerationRequest::text("hi").model("gpt-4o"))
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::TimeoutError(_)));

    gw.flush_usage().await;
    let rows = recorder.entries();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].success);
}

#[tokio::test]
async fn caller_cancellation_aborts_dispatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_response("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let recorder = MemoryUsageRecorder::new();
    let settings = GatewaySettings {
        openai_api_key: Some("sk-test".into()),
        ..Default::default()
    };
    let gw = gateway(mock_config(&server), settings, MapEnv::new(), &recorder);

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = gw
        .generate_with_cancel(GenerationRequest::text("hi").model("gpt-4o"), token)
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Cancelled(_)));
    gw.flush_usage().await;
    assert_eq!(recorder.entries().len(), 1);
}

#[tokio::test]
async fn advance_on_failure_tries_next_image_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/images/generations"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/zai/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(images_b64_response(&png_base64())))
        .expect(1)
        .mount(&server)
        .await;

    let recorder = MemoryUsageRecorder::new();
    let settings = GatewaySettings {
        openai_api_key: Some("sk-test".into()),
        zai_api_key: Some("z-test".into()),
        ..Default::default()
    };
    let config = mock_config(&server)
        .with_fallback(FallbackPolicy::default().with_advance_on_failure(true));
    let gw = gateway(config, settings, MapEnv::new(), &recorder);

    let result = gw
        .generate(GenerationRequest::image("a boat").provider("openai"))
        .await
        .unwrap();
    assert_eq!(result.provider_used, ProviderId::Zai);

    gw.flush_usage().await;
    let mut rows: Vec<(String, bool)> = recorder
        .entries()
        .into_iter()
        .map(|row| (row.provider, row.success))
        .collect();
    rows.sort();
    assert_eq!(rows, [("openai".to_string(), false), ("zai".to_string(), true)]);
}

#[tokio::test]
async fn image_failure_without_advance_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/images/generations"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(1)
        .mount(&server)
        .await;

    let recorder = MemoryUsageRecorder::new();
    let settings = GatewaySettings {
        openai_api_key: Some("sk-test".into()),
        zai_api_key: Some("z-test".into()),
        ..Default::default()
    };
    let gw = gateway(mock_config(&server), settings, MapEnv::new(), &recorder);

    let err = gw
        .generate(GenerationRequest::image("a boat").provider("openai"))
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::ProviderError { status: 503, .. }));
    gw.flush_usage().await;
    assert_eq!(recorder.entries().len(), 1);
}

#[tokio::test]
async fn opt_in_text_fallback_switches_to_default_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/anthropic/messages"))
        .and(body_partial_json(json!({ "model": "claude-sonnet-4-20250514" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_response("fallback text")))
        .expect(1)
        .mount(&server)
        .await;

    let recorder = MemoryUsageRecorder::new();
    let settings = GatewaySettings {
        anthropic_api_key: Some("a-test".into()),
        ..Default::default()
    };
    let config =
        mock_config(&server).with_fallback(FallbackPolicy::default().with_text_fallback(true));
    let gw = gateway(config, settings, MapEnv::new(), &recorder);

    let result = gw
        .generate(GenerationRequest::text("hi").model("gpt-4o"))
        .await
        .unwrap();
    assert_eq!(result.provider_used, ProviderId::Anthropic);
    assert_eq!(result.model_used, "claude-sonnet-4-20250514");
    gw.flush_usage().await;
    assert_eq!(recorder.entries()[0].provider, "anthropic");
}

#[tokio::test]
async fn override_sends_the_provider_default_model_not_the_settings_one() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/anthropic/messages"))
        .and(body_partial_json(json!({ "model": "claude-sonnet-4-20250514" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_response("ok")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/openai/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let recorder = MemoryUsageRecorder::new();
    let settings = GatewaySettings {
        anthropic_api_key: Some("a-test".into()),
        default_text_provider: Some("openai".into()),
        default_text_model: Some("gpt-4o".into()),
        ..Default::default()
    };
    let gw = gateway(mock_config(&server), settings, MapEnv::new(), &recorder);

    let result = gw
        .generate(GenerationRequest::text("hi").provider("anthropic"))
        .await
        .unwrap();
    assert_eq!(result.provider_used, ProviderId::Anthropic);
    assert_eq!(result.model_used, "claude-sonnet-4-20250514");

    gw.flush_usage().await;
    assert_eq!(recorder.entries()[0].model, "claude-sonnet-4-20250514");
}

/// A usage store that rejects every write.
struct BrokenRecorder;

#[async_trait]
impl UsageRecorder for BrokenRecorder {
    async fn record(&self, _entry: UsageLogEntry) -> Result<(), LlmError> {
        Err(LlmError::DatabaseError("usage table is locked".into()))
    }
}

#[tokio::test]
async fn failing_usage_store_leaves_result_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("still fine")))
        .expect(1)
        .mount(&server)
        .await;

    let gw = Gateway::builder()
        .config(mock_config(&server))
        .static_settings(GatewaySettings {
            openai_api_key: Some("sk-test".into()),
            ..Default::default()
        })
        .env(Arc::new(MapEnv::new()))
        .recorder(Arc::new(BrokenRecorder))
        .build()
        .unwrap();

    let result = gw
        .generate(GenerationRequest::text("hi").model("gpt-4o"))
        .await
        .unwrap();
    gw.flush_usage().await;

    assert!(result.success);
    assert_eq!(result.text_or_empty(), "still fine");
    assert_eq!(result.provider_used, ProviderId::OpenAi);
    assert_eq!(result.tokens_used, Some(21));
}

#[tokio::test]
async fn failing_usage_store_leaves_error_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({ "error": { "message": "slow down" } })))
        .expect(1)
        .mount(&server)
        .await;

    let gw = Gateway::builder()
        .config(mock_config(&server))
        .static_settings(GatewaySettings {
            openai_api_key: Some("sk-test".into()),
            ..Default::default()
        })
        .env(Arc::new(MapEnv::new()))
        .recorder(Arc::new(BrokenRecorder))
        .build()
        .unwrap();

    let err = gw
        .generate(GenerationRequest::text("hi").model("gpt-4o"))
        .await
        .unwrap_err();
    gw.flush_usage().await;
    assert!(matches!(err, LlmError::RateLimitError(_)));
}
