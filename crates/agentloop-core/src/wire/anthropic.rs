//! Anthropic Messages format

use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::decode;
use crate::error::Result;
use crate::message::{Message, Role};
use crate::provider::{ModelConfig, Provider};
use crate::response::{ModelResponse, ResponseMetadata, TokenUsage};
use crate::tool::{ToolCall, ToolDefinition};

/// Anthropic requires `max_tokens` on every request.
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: Option<String>,
    content: Option<Vec<ContentBlock>>,
    stop_reason: Option<String>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

/// First system message, hoisted out of the conversation
pub fn extract_system(messages: &[Message]) -> Option<&str> {
    messages
        .iter()
        .find(|m| m.role() == Role::System)
        .map(Message::content)
}

/// Non-system messages as `{role, content}`
pub fn transform_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .filter(|m| m.role() != Role::System)
        .map(|m| json!({ "role": m.role().as_str(), "content": m.content() }))
        .collect()
}

/// Tool definitions as `{name, description, input_schema}`
pub fn transform_tools(tool_definitions: &[ToolDefinition]) -> Vec<Value> {
    tool_definitions
        .iter()
        .map(|d| {
            json!({
                "name": d.function.name,
                "description": d.function.description,
                "input_schema": d.function.parameters,
            })
        })
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
        "max_tokens": config.max_output_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
    });

    if let Some(temperature) = config.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(system) = extract_system(messages) {
        body["system"] = json!(system);
    }
    if !tool_definitions.is_empty() {
        body["tools"] = Value::Array(transform_tools(tool_definitions));
    }

    body
}

pub fn parse_response(payload: &Value) -> Result<ModelResponse> {
    let response: MessagesResponse = decode(Provider::Anthropic, payload)?;

    let mut content: Option<String> = None;
    let mut tool_calls = Vec::new();

    for block in response.content.unwrap_or_default() {
        match block {
            ContentBlock::Text { text } => content.get_or_insert_with(String::new).push_str(&text),
            ContentBlock::ToolUse { id, name, input } => {
                let arguments = match input {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                tool_calls.push(ToolCall::new(id, name, arguments));
            }
            ContentBlock::Other => {}
        }
    }

    Ok(ModelResponse {
        content,
        tool_calls,
        metadata: ResponseMetadata {
            model: response.model,
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens.saturating_add(u.output_tokens),
            }),
            finish_reason: response.stop_reason,
        },
    })
}
