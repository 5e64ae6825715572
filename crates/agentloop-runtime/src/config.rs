//! Runtime Configuration
//!
//! Environment-driven settings for building agents. Core types never read
//! the environment; everything ambient is resolved here.

use std::collections::HashMap;
use std::str::FromStr;

use agentloop_core::{
    error::{AgentError, Result},
    provider::{ModelConfig, Provider},
    reasoning::{AgentConfig, ToolFailurePolicy},
};
use serde::{Deserialize, Serialize};

/// Which [`Transport`](agentloop_core::Transport) to build
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Http,
    Mock,
}

impl FromStr for TransportKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "mock" => Ok(Self::Mock),
            other => Err(AgentError::config(format!(
                "Unknown transport: {other}. Expected http or mock."
            ))),
        }
    }
}

/// Named tool sets the factory can register
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolPreset {
    /// get_weather, calculate and datetime
    #[default]
    Default,
    /// get_weather only
    Demo,
    None,
}

impl FromStr for ToolPreset {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "demo" => Ok(Self::Demo),
            "none" => Ok(Self::None),
            other => Err(AgentError::config(format!(
                "Unknown tool preset: {other}. Expected default, demo or none."
            ))),
        }
    }
}

/// Credentials and model for one provider
#[derive(Clone, Default)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Everything needed to assemble an agent
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Provider used by default
    pub provider: Provider,

    pub providers: HashMap<Provider, ProviderSettings>,

    pub temperature: f32,
    pub max_output_tokens: u32,

    /// Sliding history window
    pub max_messages: usize,

    /// Accepted but not enforced
    pub max_tokens: u32,

    pub max_iterations: usize,
    pub verbose: bool,
    pub tool_failure: ToolFailurePolicy,
    pub transport: TransportKind,
    pub tools: ToolPreset,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAi,
            providers: HashMap::new(),
            temperature: 0.7,
            max_output_tokens: 4000,
            max_messages: 50,
            max_tokens: 4000,
            max_iterations: 10,
            verbose: false,
            tool_failure: ToolFailurePolicy::Abort,
            transport: TransportKind::Http,
            tools: ToolPreset::Default,
        }
    }
}

/// Environment variable prefix for each provider's settings
const fn env_prefix(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAi => "OPENAI",
        Provider::Anthropic => "ANTHROPIC",
        Provider::Gemini => "GEMINI",
    }
}

impl RuntimeConfig {
    /// Read the process environment
    ///
    /// Binaries load `.env` themselves before calling this.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let mut providers = HashMap::new();
        for provider in Provider::ALL {
            let prefix = env_prefix(provider);
            providers.insert(
                provider,
                ProviderSettings {
                    api_key: get(&format!("{prefix}_API_KEY")),
                    model: get(&format!("{prefix}_MODEL")),
                    base_url: get(&format!("{prefix}_BASE_URL")),
                },
            );
        }

        let config = Self {
            provider: parse_or(&get, "AGENTLOOP_PROVIDER", defaults.provider)?,
            providers,
            temperature: parse_or(&get, "AGENTLOOP_TEMPERATURE", defaults.temperature)?,
            max_output_tokens: parse_or(&get, "AGENTLOOP_MAX_OUTPUT_TOKENS", defaults.max_output_tokens)?,
            max_messages: parse_or(&get, "AGENTLOOP_MAX_MESSAGES", defaults.max_messages)?,
            max_tokens: parse_or(&get, "AGENTLOOP_MAX_TOKENS", defaults.max_tokens)?,
            max_iterations: parse_or(&get, "AGENTLOOP_MAX_ITERATIONS", defaults.max_iterations)?,
            verbose: get("AGENTLOOP_VERBOSE").is_some_and(|v| parse_flag(&v)),
            tool_failure: match get("AGENTLOOP_TOOL_FAILURE") {
                Some(v) => parse_policy(&v)?,
                None => defaults.tool_failure,
            },
            transport: parse_or(&get, "AGENTLOOP_TRANSPORT", defaults.transport)?,
            tools: parse_or(&get, "AGENTLOOP_TOOLS", defaults.tools)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check limits and that the default provider can be reached
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(AgentError::config("AGENTLOOP_MAX_ITERATIONS must be positive"));
        }
        if self.max_messages == 0 {
            return Err(AgentError::config("AGENTLOOP_MAX_MESSAGES must be positive"));
        }
        self.model_config(self.provider).map(|_| ())
    }

    /// Model configuration for a provider
    ///
    /// Fails when the HTTP transport is selected and the provider has no
    /// API key.
    pub fn model_config(&self, provider: Provider) -> Result<ModelConfig> {
        let settings = self.providers.get(&provider).cloned().unwrap_or_default();

        if self.transport == TransportKind::Http && settings.api_key.is_none() {
            return Err(AgentError::missing_api_key(provider));
        }

        let mut config = ModelConfig::new(provider)
            .with_temperature(self.temperature)
            .with_max_output_tokens(self.max_output_tokens);
        if let Some(key) = settings.api_key {
            config = config.with_api_key(key);
        }
        if let Some(model) = settings.model {
            config = config.with_model(model);
        }
        if let Some(base_url) = settings.base_url {
            config = config.with_base_url(base_url);
        }
        Ok(config)
    }

    /// Loop settings for agents built from this configuration
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            max_iterations: self.max_iterations,
            verbose: self.verbose,
            tool_failure: self.tool_failure,
            ..AgentConfig::default()
        }
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e| AgentError::config(format!("Invalid {key} '{raw}': {e}")))
    })
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_policy(value: &str) -> Result<ToolFailurePolicy> {
    match value.trim().to_lowercase().as_str() {
        "abort" => Ok(ToolFailurePolicy::Abort),
        "continue" => Ok(ToolFailurePolicy::Continue),
        other => Err(AgentError::config(format!(
            "Invalid AGENTLOOP_TOOL_FAILURE '{other}': expected abort or continue"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_key() {
        let config = RuntimeConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-1")])).unwrap();

        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(config.max_messages, 50);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.tool_failure, ToolFailurePolicy::Abort);
        assert_eq!(config.transport, TransportKind::Http);

        let model = config.model_config(Provider::OpenAi).unwrap();
        assert_eq!(model.model, "gpt-4");
        assert_eq!(model.temperature, Some(0.7));
        assert_eq!(model.max_output_tokens, Some(4000));
        assert_eq!(model.api_key.as_deref(), Some("sk-1"));
    }

    #[test]
    fn test_missing_key_fails_for_http() {
        let err = RuntimeConfig::from_lookup(lookup(&[("AGENTLOOP_PROVIDER", "anthropic")])).unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));
        assert!(err.to_string().contains("anthropic"));
    }

    #[test]
    fn test_mock_transport_needs_no_key() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("AGENTLOOP_PROVIDER", "Gemini"),
            ("AGENTLOOP_TRANSPORT", "mock"),
            ("GEMINI_MODEL", "gemini-pro"),
        ]))
        .unwrap();

        let model = config.model_config(Provider::Gemini).unwrap();
        assert_eq!(model.model, "gemini-pro");
        assert!(model.api_key.is_none());
    }

    #[test]
    fn test_unknown_provider() {
        let err = RuntimeConfig::from_lookup(lookup(&[("AGENTLOOP_PROVIDER", "mistral")])).unwrap_err();
        assert!(err.to_string().contains("mistral"));
    }

    #[test]
    fn test_overrides() {
        let config = RuntimeConfig::from_lookup(lookup(&[
            ("AGENTLOOP_TRANSPORT", "mock"),
            ("AGENTLOOP_MAX_MESSAGES", "5"),
            ("AGENTLOOP_MAX_ITERATIONS", "3"),
            ("AGENTLOOP_VERBOSE", "true"),
            ("AGENTLOOP_TOOL_FAILURE", "continue"),
            ("AGENTLOOP_TOOLS", "demo"),
            ("AGENTLOOP_TEMPERATURE", "0.2"),
        ]))
        .unwrap();

        assert_eq!(config.max_messages, 5);
        assert_eq!(config.tools, ToolPreset::Demo);

        let agent = config.agent_config();
        assert_eq!(agent.max_iterations, 3);
        assert!(agent.verbose);
        assert_eq!(agent.tool_failure, ToolFailurePolicy::Continue);
        assert_eq!(config.model_config(Provider::OpenAi).unwrap().temperature, Some(0.2));
    }

    #[test]
    fn test_invalid_numbers() {
        let err = RuntimeConfig::from_lookup(lookup(&[
            ("AGENTLOOP_TRANSPORT", "mock"),
            ("AGENTLOOP_MAX_ITERATIONS", "lots"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("AGENTLOOP_MAX_ITERATIONS"));

        let err = RuntimeConfig::from_lookup(lookup(&[
            ("AGENTLOOP_TRANSPORT", "mock"),
            ("AGENTLOOP_MAX_ITERATIONS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));
    }
}
