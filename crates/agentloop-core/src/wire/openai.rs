//! OpenAI Chat Completions format
//!
//! The unified message and tool shapes are OpenAI's own, so requests pass
//! through unchanged.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::decode;
use crate::error::Result;
use crate::message::Message;
use crate::provider::{ModelConfig, Provider};
use crate::response::{ModelResponse, ResponseMetadata, TokenUsage};
use crate::tool::{ToolCall, ToolDefinition};

#[derive(Debug, Default, Deserialize)]
struct ChatCompletion {
    model: Option<String>,
    choices: Option<Vec<Choice>>,
    usage: Option<Usage>,
}

#[derive(Debug, Default, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

/// Messages as flat `{role, content, ...metadata}` records
pub fn transform_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| Value::Object(m.to_record()))
        .collect()
}

/// Tool definitions in the unified function shape
pub fn transform_tools(tool_definitions: &[ToolDefinition]) -> Vec<Value> {
    tool_definitions
        .iter()
        .map(|d| json!(d))
        .collect()
}

pub fn build_request(
    config: &ModelConfig,
    messages: &[Message],
    tool_definitions: &[ToolDefinition],
) -> Value {
    let mut body = json!({
        "model": config.model,
        "messages": transform_messages(messages),
    });

    if let Some(temperature) = config.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = config.max_output_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if !tool_definitions.is_empty() {
        body["tools"] = Value::Array(transform_tools(tool_definitions));
        body["tool_choice"] = json!("auto");
    }

    body
}

pub fn parse_response(payload: &Value) -> Result<ModelResponse> {
    let completion: ChatCompletion = decode(Provider::OpenAi, payload)?;

    let first = completion.choices.unwrap_or_default().into_iter().next().unwrap_or_default();
    let message = first.message.unwrap_or_default();

    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| {
            let arguments = parse_arguments(&call.function.name, call.function.arguments.as_deref());
            ToolCall::new(call.id, call.function.name, arguments)
        })
        .collect();

    Ok(ModelResponse {
        content: message.content,
        tool_calls,
        metadata: ResponseMetadata {
            model: completion.model,
            usage: completion.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: first.finish_reason,
        },
    })
}

/// Arguments arrive JSON-encoded; anything unparsable becomes an empty map.
fn parse_arguments(tool: &str, raw: Option<&str>) -> Map<String, Value> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Map::new();
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            tracing::warn!(tool, raw, "Discarding malformed tool call arguments");
            Map::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_payload(arguments: &str) -> Value {
        json!({
            "id": "chatcmpl-test",
            "model": "gpt-4",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "get_weather", "arguments": arguments}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 50, "completion_tokens": 20, "total_tokens": 70}
        })
    }

    #[test]
    fn test_parse_tool_call() {
        let response = parse_response(&tool_payload(r#"{"location":"Paris"}"#)).unwrap();

        assert_eq!(response.content(), None);
        assert_eq!(response.tool_calls().len(), 1);
        let call = &response.tool_calls()[0];
        assert_eq!(call.id, "call_1");
        assert_eq!(call.name, "get_weather");
        assert_eq!(call.arguments["location"], "Paris");

        assert_eq!(response.metadata.model.as_deref(), Some("gpt-4"));
        assert_eq!(response.metadata.finish_reason.as_deref(), Some("tool_calls"));
        assert_eq!(response.metadata.usage.unwrap().total_tokens, 70);
    }

    #[test]
    fn test_malformed_arguments_become_empty() {
        let response = parse_response(&tool_payload("{not json")).unwrap();
        assert_eq!(response.tool_calls().len(), 1);
        assert!(response.tool_calls()[0].arguments.is_empty());

        let response = parse_response(&tool_payload("[1, 2]")).unwrap();
        assert!(response.tool_calls()[0].arguments.is_empty());
    }

    #[test]
    fn test_missing_choices() {
        let response = parse_response(&json!({"model": "gpt-4"})).unwrap();
        assert_eq!(response.content(), None);
        assert!(!response.has_tool_calls());
        assert_eq!(response.metadata.usage, None);
    }

    #[test]
    fn test_request_passes_through() {
        let config = ModelConfig::new(Provider::OpenAi)
            .with_temperature(0.5)
            .with_max_output_tokens(4000);
        let messages = vec![
            Message::system("sys"),
            Message::user("hi"),
            Message::tool("42", "call_1", "answer"),
        ];
        let tools = vec![ToolDefinition::function("answer", "Answer", json!({"type": "object"}))];

        let body = build_request(&config, &messages, &tools);

        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["max_tokens"], 4000);
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["messages"][0], json!({"role": "system", "content": "sys"}));
        assert_eq!(
            body["messages"][2],
            json!({"role": "tool", "content": "42", "tool_call_id": "call_1", "name": "answer"})
        );
        assert_eq!(
            body["tools"][0],
            json!({"type": "function", "function": {"name": "answer", "description": "Answer", "parameters": {"type": "object"}}})
        );
    }

    #[test]
    fn test_request_without_tools() {
        let body = build_request(&ModelConfig::new(Provider::OpenAi), &[Message::user("hi")], &[]);
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
        assert!(body.get("temperature").is_none());
    }
}
