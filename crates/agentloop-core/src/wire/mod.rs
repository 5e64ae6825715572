//! Provider Wire Formats
//!
//! Pure request/response shaping for each provider family. Nothing here
//! performs I/O, so every mapping is testable on plain JSON.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{ModelConfig, Provider};
use crate::response::ModelResponse;
use crate::tool::ToolDefinition;

/// Build the request body for the configured provider
pub fn build_request(
    config: &ModelConfig,
    messages: &[Message],
    tool_definitions: &[ToolDefinition],
) -> Value {
    match config.provider {
        Provider::OpenAi => openai::build_request(config, messages, tool_definitions),
        Provider::Anthropic => anthropic::build_request(config, messages, tool_definitions),
        Provider::Gemini => gemini::build_request(config, messages, tool_definitions),
    }
}

/// Normalize a raw provider payload
pub fn parse_response(provider: Provider, payload: &Value) -> Result<ModelResponse> {
    match provider {
        Provider::OpenAi => openai::parse_response(payload),
        Provider::Anthropic => anthropic::parse_response(payload),
        Provider::Gemini => gemini::parse_response(payload),
    }
}

/// Deserialize a provider payload, reporting shape errors against the provider
fn decode<T: DeserializeOwned>(provider: Provider, payload: &Value) -> Result<T> {
    T::deserialize(payload).map_err(|e| AgentError::InvalidResponse {
        provider,
        message: e.to_string(),
    })
}
