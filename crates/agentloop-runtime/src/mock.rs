//! Mock Transport
//!
//! Offline stand-in for [`HttpTransport`](crate::HttpTransport). Answers
//! with canned payloads in each provider's own wire shape, so the full
//! normalization path still runs.

use agentloop_core::{
    error::Result,
    provider::{Provider, ProviderRequest, Transport},
};
use async_trait::async_trait;
use serde_json::{Value, json};
use uuid::Uuid;

/// Arguments of the canned weather call
const MOCK_LOCATION: &str = "San Francisco, CA";
const MOCK_UNIT: &str = "celsius";

/// Canned-response transport selected with `AGENTLOOP_TRANSPORT=mock`
///
/// Requests a `get_weather` call when tools are offered and the latest
/// user text mentions weather; otherwise replies with fixed text.
#[derive(Clone, Copy, Debug, Default)]
pub struct MockTransport;

impl MockTransport {
    pub const fn new() -> Self {
        Self
    }

    /// Fixed text reply for a provider
    pub fn reply_text(provider: Provider) -> String {
        let name = match provider {
            Provider::OpenAi => "OpenAI",
            Provider::Anthropic => "Anthropic Claude",
            Provider::Gemini => "Gemini",
        };
        format!("This is a mock response from {name}. In production, this would be the actual API response.")
    }

    fn wants_weather(request: &ProviderRequest) -> bool {
        let offers_tools = request
            .body
            .get("tools")
            .and_then(Value::as_array)
            .is_some_and(|tools| !tools.is_empty());

        offers_tools
            && last_user_text(request)
                .is_some_and(|text| text.to_lowercase().contains("weather"))
    }

    fn tool_call_payload(request: &ProviderRequest) -> Value {
        let arguments = json!({ "location": MOCK_LOCATION, "unit": MOCK_UNIT });
        let id = Uuid::new_v4().simple();

        match request.provider {
            Provider::OpenAi => json!({
                "id": format!("chatcmpl-{id}"),
                "object": "chat.completion",
                "model": request.model,
                "choices": [{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": format!("call_{id}"),
                            "type": "function",
                            "function": {
                                "name": "get_weather",
                                "arguments": arguments.to_string()
                            }
                        }]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": { "prompt_tokens": 50, "completion_tokens": 20, "total_tokens": 70 }
            }),
            Provider::Anthropic => json!({
                "id": format!("msg_{id}"),
                "type": "message",
                "role": "assistant",
                "model": request.model,
                "content": [{
                    "type": "tool_use",
                    "id": format!("toolu_{id}"),
                    "name": "get_weather",
                    "input": arguments
                }],
                "stop_reason": "tool_use",
                "usage": { "input_tokens": 50, "output_tokens": 20 }
            }),
            Provider::Gemini => json!({
                "candidates": [{
                    "content": {
                        "parts": [{ "functionCall": { "name": "get_weather", "args": arguments } }],
                        "role": "model"
                    },
                    "finishReason": "STOP"
                }],
                "usageMetadata": { "promptTokenCount": 50, "candidatesTokenCount": 20, "totalTokenCount": 70 },
                "modelVersion": request.model
            }),
        }
    }

    fn text_payload(request: &ProviderRequest) -> Value {
        let text = Self::reply_text(request.provider);
        let id = Uuid::new_v4().simple();

        match request.provider {
            Provider::OpenAi => json!({
                "id": format!("chatcmpl-{id}"),
                "object": "chat.completion",
                "model": request.model,
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": text },
                    "finish_reason": "stop"
                }],
                "usage": { "prompt_tokens": 30, "completion_tokens": 15, "total_tokens": 45 }
            }),
            Provider::Anthropic => json!({
                "id": format!("msg_{id}"),
                "type": "message",
                "role": "assistant",
                "model": request.model,
                "content": [{ "type": "text", "text": text }],
                "stop_reason": "end_turn",
                "usage": { "input_tokens": 30, "output_tokens": 15 }
            }),
            Provider::Gemini => json!({
                "candidates": [{
                    "content": { "parts": [{ "text": text }], "role": "model" },
                    "finishReason": "STOP"
                }],
                "usageMetadata": { "promptTokenCount": 30, "candidatesTokenCount": 15, "totalTokenCount": 45 },
                "modelVersion": request.model
            }),
        }
    }
}

/// Text of the final message when it comes from the user
///
/// Tool results are never user text, so a finished tool round always
/// gets a text reply.
fn last_user_text(request: &ProviderRequest) -> Option<&str> {
    let list = match request.provider {
        Provider::OpenAi | Provider::Anthropic => request.body.get("messages"),
        Provider::Gemini => request.body.get("contents"),
    };
    let last = list.and_then(Value::as_array).and_then(|items| items.last())?;

    if last.get("role").and_then(Value::as_str) != Some("user") {
        return None;
    }

    match request.provider {
        Provider::OpenAi | Provider::Anthropic => last.get("content").and_then(Value::as_str),
        Provider::Gemini => last
            .get("parts")
            .and_then(Value::as_array)
            .and_then(|parts| parts.iter().find_map(|p| p.get("text").and_then(Value::as_str))),
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ProviderRequest) -> Result<Value> {
        let payload = if Self::wants_weather(request) {
            Self::tool_call_payload(request)
        } else {
            Self::text_payload(request)
        };

        tracing::debug!(provider = %request.provider, "Serving canned response");
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloop_core::{
        message::Message,
        provider::{LanguageModel, ModelAdapter, ModelConfig},
        tool::{GetWeatherTool, Tool},
    };
    use std::sync::Arc;

    fn adapter(provider: Provider) -> ModelAdapter {
        ModelAdapter::new(ModelConfig::new(provider), Arc::new(MockTransport::new()))
    }

    #[tokio::test]
    async fn test_weather_question_triggers_tool_call_for_every_provider() {
        let tools = vec![GetWeatherTool.definition()];
        let messages = vec![Message::user("What's the Weather like?")];

        for provider in Provider::ALL {
            let response = adapter(provider).generate(&messages, &tools).await.unwrap();

            assert_eq!(response.tool_calls().len(), 1, "{provider}");
            let call = &response.tool_calls()[0];
            assert_eq!(call.name, "get_weather");
            assert_eq!(call.arguments["location"], MOCK_LOCATION);
            assert_eq!(call.arguments["unit"], MOCK_UNIT);
            assert!(!call.id.is_empty());
        }
    }

    #[tokio::test]
    async fn test_text_reply_without_tools() {
        let messages = vec![Message::user("weather?")];

        for provider in Provider::ALL {
            let response = adapter(provider).generate(&messages, &[]).await.unwrap();
            assert!(!response.has_tool_calls());
            assert_eq!(response.content(), Some(MockTransport::reply_text(provider).as_str()));
            assert!(response.metadata.usage.is_some());
        }
    }

    #[tokio::test]
    async fn test_tool_result_gets_text_reply() {
        let tools = vec![GetWeatherTool.definition()];
        let messages = vec![
            Message::user("weather in SF?"),
            Message::tool("{\"weather\": \"sunny\"}", "call_1", "get_weather"),
        ];

        for provider in Provider::ALL {
            let response = adapter(provider).generate(&messages, &tools).await.unwrap();
            assert!(!response.has_tool_calls(), "{provider}");
        }
    }
}
