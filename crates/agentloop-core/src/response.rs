//! Unified Model Response
//!
//! Every provider payload is normalized into a [`ModelResponse`] before the
//! agent loop sees it.

use serde::{Deserialize, Serialize};

use crate::tool::ToolCall;

/// Token usage statistics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Provider-neutral response metadata
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Model identifier reported by the provider
    pub model: Option<String>,

    /// Token usage statistics (if reported)
    pub usage: Option<TokenUsage>,

    /// Raw finish/stop reason string
    pub finish_reason: Option<String>,
}

/// Response from a single model invocation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub metadata: ResponseMetadata,
}

impl ModelResponse {
    /// Plain text response without tool calls
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Response requesting the given tool calls
    pub fn with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::default()
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }
}
