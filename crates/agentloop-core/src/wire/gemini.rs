//! Gemini generateContent format
//!
//! Gemini calls the assistant `model`, has no system role in `contents`
//! and no tool role at all: tool results travel as `functionResponse`
//! parts sent by the user.

use serde::Deserialize;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use super::decode;
use crate::error::Result;
use crate::message::{Message, Role};
use crate::provider::{ModelConfig, Provider};
use crate::response::{ModelResponse, ResponseMetadata, TokenUsage};
use crate::tool::{ToolCall, ToolDefinition};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    total_token_count: u64,
}

/// Conversation as Gemini `contents`
pub fn transform_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .filter_map(|m| match m.role() {
            Role::System => None,
            Role::Tool => {
                // Structured results go back as JSON, anything else as the raw string
                let result = serde_json::from_str::<Value>(m.content())
                    .unwrap_or_else(|_| Value::String(m.content().to_string()));
                Some(json!({
                    "role": "user",
                    "parts": [{
                        "functionResponse": {
                            "name": m.tool_name().unwrap_or_default(),
                            "response": { "result": result }
                        }
                    }]
                }))
            }
            Role::User => Some(json!({ "role": "user", "parts": [{ "text": m.content() }] })),
            Role::Assistant => Some(json!({ "role": "model", "parts": [{ "text": m.content() }] })),
        })
        .collect()
}

/// Tool definitions wrapped as one `functionDeclarations` tool
pub fn transform_tools(tool_definitions: &[ToolDefinition]) -> Value {
    let declarations: Vec<Value> = tool_definitions
        .iter()
        .map(|d| {
            json!({
                "name": d.function.name,
                "description": d.function.description,
                "parameters": d.function.parameters,
            })
        })
        .collect();

    json!({ "functionDeclarations": declarations })
}

pub fn build_request(
    config: &ModelConfig,
    messages: &[Message],
    tool_definitions: &[ToolDefinition],
) -> Value {
    let mut body = json!({ "contents": transform_messages(messages) });

    let mut generation = Map::new();
    if let Some(temperature) = config.temperature {
        generation.insert("temperature".into(), json!(temperature));
    }
    if let Some(max_tokens) = config.max_output_tokens {
        generation.insert("maxOutputTokens".into(), json!(max_tokens));
    }
    if !generation.is_empty() {
        body["generationConfig"] = Value::Object(generation);
    }
    if !tool_definitions.is_empty() {
        body["tools"] = json!([transform_tools(tool_definitions)]);
    }

    body
}

pub fn parse_response(payload: &Value) -> Result<ModelResponse> {
    let response: GenerateContentResponse = decode(Provider::Gemini, payload)?;

    let candidate = response
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .unwrap_or_default();

    let mut content: Option<String> = None;
    let mut tool_calls = Vec::new();

    let parts = candidate.content.and_then(|c| c.parts).unwrap_or_default();
    for part in parts {
        if let Some(text) = part.text {
            content.get_or_insert_with(String::new).push_str(&text);
        } else if let Some(call) = part.function_call {
            // Gemini does not assign call IDs
            let id = format!("{}_{}", call.name, Uuid::new_v4().simple());
            tool_calls.push(ToolCall::new(id, call.name, call.args.unwrap_or_default()));
        }
    }

    Ok(ModelResponse {
        content,
        tool_calls,
        metadata: ResponseMetadata {
            model: response.model_version,
            usage: response.usage_metadata.map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            }),
            finish_reason: candidate.finish_reason,
        },
    })
}
