use std::sync::Arc;

use agentloop_core::message::Message;
use agentloop_core::provider::{LanguageModel, ModelAdapter, ModelConfig, Provider};
use agentloop_core::tool::{GetWeatherTool, Tool};
use agentloop_core::{AgentBuilder, AgentError};
use agentloop_runtime::HttpTransport;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter(provider: Provider, server: &MockServer) -> ModelAdapter {
    let config = ModelConfig::new(provider)
        .with_api_key("test-key")
        .with_base_url(server.uri());
    ModelAdapter::new(config, Arc::new(HttpTransport::new().unwrap()))
}

#[tokio::test]
async fn test_openai_text_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "gpt-4", "messages": [{"role": "user", "content": "Hi"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4",
            "choices": [{
                "message": {"role": "assistant", "content": "Hello from OpenAI!"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 5, "completion_tokens": 4, "total_tokens": 9}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = adapter(Provider::OpenAi, &server)
        .generate(&[Message::user("Hi")], &[])
        .await
        .unwrap();

    assert_eq!(response.content(), Some("Hello from OpenAI!"));
    assert_eq!(response.metadata.usage.unwrap().total_tokens, 9);
}

#[tokio::test]
async fn test_anthropic_headers_and_system() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({"system": "Be brief.", "max_tokens": 1024})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "claude-3-opus-20240229",
            "content": [{"type": "tool_use", "id": "toolu_01", "name": "get_weather", "input": {"location": "Oslo"}}],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 15, "output_tokens": 8}
        })))
        .mount(&server)
        .await;

    let tools = vec![GetWeatherTool.definition()];
    let response = adapter(Provider::Anthropic, &server)
        .generate(&[Message::system("Be brief."), Message::user("Oslo?")], &tools)
        .await
        .unwrap();

    assert_eq!(response.tool_calls().len(), 1);
    assert_eq!(response.tool_calls()[0].id, "toolu_01");
    assert_eq!(response.tool_calls()[0].arguments["location"], "Oslo");
}

#[tokio::test]
async fn test_gemini_model_in_path() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [{"text": "Hello from Gemini!"}], "role": "model"},
                "finishReason": "STOP"
            }]
        })))
        .mount(&server)
        .await;

    let response = adapter(Provider::Gemini, &server)
        .generate(&[Message::user("Hi")], &[])
        .await
        .unwrap();

    assert_eq!(response.content(), Some("Hello from Gemini!"));
    assert_eq!(response.metadata.finish_reason.as_deref(), Some("STOP"));
}

#[tokio::test]
async fn test_http_error_is_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string(
            r#"{"error":{"type":"authentication_error","message":"Invalid API key"}}"#,
        ))
        .mount(&server)
        .await;

    let err = adapter(Provider::Anthropic, &server)
        .generate(&[Message::user("Hi")], &[])
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    match err {
        AgentError::Transport { provider, message } => {
            assert_eq!(provider, Provider::Anthropic);
            assert!(message.contains("401"));
            assert!(message.contains("Invalid API key"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_non_json_body_is_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = adapter(Provider::OpenAi, &server)
        .generate(&[Message::user("Hi")], &[])
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Transport { .. }));
}

#[tokio::test]
async fn test_agent_over_http_feeds_tool_result_back() {
    let server = MockServer::start().await;

    // Second round: the tool result is present in the conversation
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"messages": [{}, {}, {"role": "tool", "tool_call_id": "call_1"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Sunny in Oslo."}, "finish_reason": "stop"}]
        })))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "get_weather", "arguments": "{\"location\":\"Oslo\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .with_priority(2)
        .mount(&server)
        .await;

    let mut agent = AgentBuilder::new()
        .model(Arc::new(adapter(Provider::OpenAi, &server)))
        .tool(GetWeatherTool)
        .build()
        .unwrap();

    let response = agent.execute("Weather in Oslo?").await.unwrap();

    assert_eq!(response.content(), "Sunny in Oslo.");
    assert_eq!(response.iterations(), 2);
    assert_eq!(response.tool_calls()[0].arguments["location"], "Oslo");
}
