//! Error Types

use thiserror::Error;

use crate::provider::Provider;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Unknown provider, missing credential or invalid limits
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Failure raised inside a tool's `execute`
    #[error("{0}")]
    Tool(#[source] anyhow::Error),

    /// Tool failure wrapped by the agent loop with the call that caused it
    #[error("Tool execution failed: {tool}: {source}")]
    ToolExecution {
        tool: String,
        arguments: serde_json::Map<String, serde_json::Value>,
        #[source]
        source: Box<AgentError>,
    },

    /// Network, auth or decoding failure while talking to a provider
    #[error("API Error ({provider}): {message}")]
    Transport { provider: Provider, message: String },

    /// Provider payload did not have the expected shape
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse { provider: Provider, message: String },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Missing credential for the selected provider
    pub fn missing_api_key(provider: Provider) -> Self {
        Self::Configuration(format!("Missing API key for provider: {provider}"))
    }

    /// Unrecognized provider name
    pub fn unknown_provider(name: &str) -> Self {
        Self::Configuration(format!(
            "Unknown provider: {name}. Supported providers are: openai, anthropic, gemini."
        ))
    }

    /// Check if error is retryable
    ///
    /// The agent never retries on its own; this is a hint for callers.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Name of the tool involved in the failure, if any
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            Self::ToolNotFound(name) | Self::ToolExecution { tool: name, .. } => Some(name),
            _ => None,
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration(_) => "The assistant is not configured correctly.".into(),
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::Tool(e) => format!("Tool error: {e}"),
            Self::ToolExecution { tool, .. } => format!("The tool '{tool}' failed to run."),
            Self::Transport { .. } => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::InvalidResponse { .. } => "The AI service returned an unexpected response.".into(),
            Self::Json(_) => "An unexpected error occurred.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_not_found_names_tool() {
        let err = AgentError::ToolNotFound("nonexistent".into());
        assert_eq!(err.to_string(), "Tool not found: nonexistent");
        assert_eq!(err.tool_name(), Some("nonexistent"));
    }

    #[test]
    fn test_retryable() {
        let err = AgentError::Transport {
            provider: Provider::OpenAi,
            message: "connection reset".into(),
        };
        assert!(err.is_retryable());
        assert!(!AgentError::config("bad").is_retryable());
    }

    #[test]
    fn test_tool_execution_keeps_cause() {
        let err = AgentError::ToolExecution {
            tool: "get_weather".into(),
            arguments: serde_json::Map::new(),
            source: Box::new(AgentError::Tool(anyhow::anyhow!("boom"))),
        };
        assert_eq!(err.to_string(), "Tool execution failed: get_weather: boom");
        assert_eq!(err.tool_name(), Some("get_weather"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
