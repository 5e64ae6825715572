//! LLM Provider Strategy Pattern
//!
//! The agent only ever talks to a [`LanguageModel`]. [`ModelAdapter`] is the
//! stock implementation: it shapes requests for one provider family, hands
//! them to an injected [`Transport`] and normalizes the raw payload.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agentloop_core::provider::{ModelAdapter, ModelConfig, Provider};
//!
//! let config = ModelConfig::new(Provider::Anthropic).with_api_key(key);
//! let model = ModelAdapter::new(config, transport);
//!
//! let response = model.generate(manager.messages(), &registry.definitions()).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::response::ModelResponse;
use crate::tool::ToolDefinition;
use crate::wire;

/// Supported provider families
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Gemini,
}

impl Provider {
    pub const ALL: [Self; 3] = [Self::OpenAi, Self::Anthropic, Self::Gemini];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }

    /// Model used when none is configured
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4",
            Self::Anthropic => "claude-3-opus-20240229",
            Self::Gemini => "gemini-2.5-flash",
        }
    }

    /// Public API base URL
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Gemini => "https://generativelanguage.googleapis.com",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "gemini" => Ok(Self::Gemini),
            other => Err(AgentError::unknown_provider(other)),
        }
    }
}

/// Configuration for one model endpoint
#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: Provider,

    /// Model identifier (e.g., "gpt-4", "claude-3-opus-20240229")
    pub model: String,

    /// Credential passed through to the transport
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Temperature for sampling
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default)]
    pub max_output_tokens: Option<u32>,

    /// Override for the provider's API base URL
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ModelConfig {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            model: provider.default_model().into(),
            api_key: None,
            temperature: None,
            max_output_tokens: None,
            base_url: None,
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub const fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Configured base URL, or the provider's public endpoint
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Provider-shaped request handed to a [`Transport`]
#[derive(Clone, Debug)]
pub struct ProviderRequest {
    pub provider: Provider,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub body: Value,
}

/// Moves a provider request over the wire and returns the raw payload
///
/// Network, auth and decoding problems surface as
/// [`AgentError::Transport`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ProviderRequest) -> Result<Value>;
}

/// Model capability consumed by the agent loop
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a response for the conversation so far
    async fn generate(
        &self,
        messages: &[Message],
        tool_definitions: &[ToolDefinition],
    ) -> Result<ModelResponse>;
}

/// [`LanguageModel`] for one provider family over an injected transport
pub struct ModelAdapter {
    config: ModelConfig,
    transport: Arc<dyn Transport>,
}

impl ModelAdapter {
    pub fn new(config: ModelConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub const fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub const fn provider(&self) -> Provider {
        self.config.provider
    }

    /// Request the adapter would send for these inputs
    pub fn build_request(
        &self,
        messages: &[Message],
        tool_definitions: &[ToolDefinition],
    ) -> ProviderRequest {
        ProviderRequest {
            provider: self.config.provider,
            model: self.config.model.clone(),
            api_key: self.config.api_key.clone(),
            base_url: self.config.base_url().to_string(),
            body: wire::build_request(&self.config, messages, tool_definitions),
        }
    }
}

#[async_trait]
impl LanguageModel for ModelAdapter {
    async fn generate(
        &self,
        messages: &[Message],
        tool_definitions: &[ToolDefinition],
    ) -> Result<ModelResponse> {
        let request = self.build_request(messages, tool_definitions);

        tracing::debug!(
            provider = %request.provider,
            model = %request.model,
            messages = messages.len(),
            tools = tool_definitions.len(),
            "Sending model request"
        );

        let payload = self.transport.send(&request).await?;
        wire::parse_response(self.config.provider, &payload)
    }
}
