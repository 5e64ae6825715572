//! Agent Factory
//!
//! Wires a [`RuntimeConfig`] into ready-to-run agents: picks the transport,
//! builds the model adapter and registers the configured tool preset.

use std::sync::Arc;

use agentloop_core::{
    error::Result,
    events::AgentObserver,
    provider::{LanguageModel, ModelAdapter, Provider, Transport},
    reasoning::{Agent, AgentBuilder, AgentResponse},
    tool::{CalculatorTool, DateTimeTool, GetWeatherTool, ToolRegistry},
};

use crate::config::{RuntimeConfig, ToolPreset, TransportKind};
use crate::http::HttpTransport;
use crate::mock::MockTransport;

/// Registry holding the tools of a preset
pub fn registry_for(preset: ToolPreset) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    match preset {
        ToolPreset::Default => {
            registry
                .register(GetWeatherTool)
                .register(CalculatorTool)
                .register(DateTimeTool);
        }
        ToolPreset::Demo => {
            registry.register(GetWeatherTool);
        }
        ToolPreset::None => {}
    }
    registry
}

/// Transport for the configured kind
pub fn transport_for(kind: TransportKind) -> Result<Arc<dyn Transport>> {
    let transport: Arc<dyn Transport> = match kind {
        TransportKind::Http => Arc::new(HttpTransport::new()?),
        TransportKind::Mock => Arc::new(MockTransport::new()),
    };
    Ok(transport)
}

/// Builds agents sharing one transport and tool registry
pub struct AgentFactory {
    config: RuntimeConfig,
    transport: Arc<dyn Transport>,
    model: Arc<dyn LanguageModel>,
    tools: Arc<ToolRegistry>,
    observer: Option<Arc<dyn AgentObserver>>,
}

impl AgentFactory {
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        config.validate()?;
        let transport = transport_for(config.transport)?;
        let model = Arc::new(ModelAdapter::new(
            config.model_config(config.provider)?,
            Arc::clone(&transport),
        ));
        let tools = Arc::new(registry_for(config.tools));

        tracing::info!(
            provider = %config.provider,
            transport = ?config.transport,
            tools = tools.len(),
            "Agent factory ready"
        );

        Ok(Self {
            config,
            transport,
            model,
            tools,
            observer: None,
        })
    }

    /// Configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::new(RuntimeConfig::from_env()?)
    }

    /// Attach an observer to every agent built from now on
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn AgentObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Model name used by default agents
    pub fn model_name(&self) -> String {
        self.config
            .model_config(self.config.provider)
            .map(|c| c.model)
            .unwrap_or_else(|_| self.config.provider.default_model().to_string())
    }

    /// Builder preloaded with the configured model, tools and limits
    pub fn builder(&self, name: impl Into<String>) -> AgentBuilder {
        self.builder_for(name, Arc::clone(&self.model), Arc::clone(&self.tools))
    }

    fn builder_for(
        &self,
        name: impl Into<String>,
        model: Arc<dyn LanguageModel>,
        tools: Arc<ToolRegistry>,
    ) -> AgentBuilder {
        let builder = AgentBuilder::new()
            .name(name)
            .model(model)
            .tools(tools)
            .config(self.config.agent_config())
            .max_messages(self.config.max_messages)
            .max_tokens(self.config.max_tokens);

        match &self.observer {
            Some(observer) => builder.observer(Arc::clone(observer)),
            None => builder,
        }
    }

    /// Agent with the default configuration
    pub fn agent(&self) -> Result<Agent> {
        self.builder("default").build()
    }

    /// Agent with a specific tool registry
    pub fn with_tools(&self, tools: ToolRegistry) -> Result<Agent> {
        self.builder_for("custom", Arc::clone(&self.model), Arc::new(tools))
            .build()
    }

    /// Agent for another provider, optionally overriding its model
    pub fn with_model(&self, provider: Provider, model: Option<&str>) -> Result<Agent> {
        let mut config = self.config.model_config(provider)?;
        if let Some(model) = model {
            config = config.with_model(model);
        }
        let adapter = Arc::new(ModelAdapter::new(config, Arc::clone(&self.transport)));

        self.builder_for("custom", adapter, Arc::clone(&self.tools))
            .build()
    }

    /// One-shot question on a fresh default agent
    pub async fn ask(&self, question: impl Into<String>) -> Result<AgentResponse> {
        self.agent()?.execute(question).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloop_core::error::AgentError;
    use agentloop_core::message::Role;

    fn mock_config(provider: Provider) -> RuntimeConfig {
        RuntimeConfig {
            provider,
            transport: TransportKind::Mock,
            ..RuntimeConfig::default()
        }
    }

    #[test]
    fn test_presets() {
        assert_eq!(
            registry_for(ToolPreset::Default).names(),
            vec!["get_weather", "calculate", "datetime"]
        );
        assert_eq!(registry_for(ToolPreset::Demo).names(), vec!["get_weather"]);
        assert!(registry_for(ToolPreset::None).is_empty());
    }

    #[tokio::test]
    async fn test_weather_round_trip_on_every_provider() {
        for provider in Provider::ALL {
            let factory = AgentFactory::new(mock_config(provider)).unwrap();
            let mut agent = factory.agent().unwrap();

            let response = agent.execute("What's the weather in San Francisco?").await.unwrap();

            assert_eq!(response.iterations(), 2, "{provider}");
            assert_eq!(response.tool_calls().len(), 1);
            assert_eq!(response.tool_calls()[0].tool, "get_weather");
            assert_eq!(response.content(), MockTransport::reply_text(provider));

            let roles: Vec<Role> = agent.messages().messages().iter().map(|m| m.role()).collect();
            assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]);
        }
    }

    #[tokio::test]
    async fn test_ask_without_weather() {
        let factory = AgentFactory::new(mock_config(Provider::Anthropic)).unwrap();
        let response = factory.ask("Hello").await.unwrap();

        assert_eq!(response.iterations(), 1);
        assert!(response.tool_calls().is_empty());
        assert_eq!(
            response.model_metadata().and_then(|m| m.finish_reason.as_deref()),
            Some("end_turn")
        );
    }

    #[tokio::test]
    async fn test_with_tools_without_weather_tool() {
        let factory = AgentFactory::new(mock_config(Provider::OpenAi)).unwrap();
        let mut agent = factory.with_tools(registry_for(ToolPreset::None)).unwrap();

        let response = agent.execute("weather?").await.unwrap();
        assert!(response.tool_calls().is_empty());
        assert_eq!(agent.name(), "custom");
    }

    #[test]
    fn test_with_model_override() {
        let factory = AgentFactory::new(mock_config(Provider::OpenAi)).unwrap();
        assert_eq!(factory.model_name(), "gpt-4");
        assert!(factory.with_model(Provider::Gemini, Some("gemini-pro")).is_ok());
    }

    #[test]
    fn test_http_requires_key() {
        let config = RuntimeConfig::default();
        let err = AgentFactory::new(config).err().unwrap();
        assert!(matches!(err, AgentError::Configuration(_)));
    }
}
