//! # agentloop-runtime
//!
//! Runtime integrations for agentloop.
//!
//! ## Transports
//!
//! - **HTTP** (default): OpenAI, Anthropic and Gemini REST endpoints via reqwest
//! - **Mock**: canned provider payloads for offline runs (`AGENTLOOP_TRANSPORT=mock`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agentloop_runtime::AgentFactory;
//!
//! let factory = AgentFactory::from_env()?;
//! let mut agent = factory.builder("assistant").system_prompt("Be brief.").build()?;
//! let response = agent.execute("What's the weather in Paris?").await?;
//! ```

pub mod config;
pub mod factory;
pub mod http;
pub mod mock;

pub use config::{ProviderSettings, RuntimeConfig, ToolPreset, TransportKind};
pub use factory::{AgentFactory, registry_for, transport_for};
pub use http::HttpTransport;
pub use mock::MockTransport;

// Re-export core types for convenience
pub use agentloop_core::{
    Agent, AgentBuilder, AgentError, AgentResponse, LanguageModel, Message, Provider, Result,
    Role, Tool, ToolRegistry, Transport,
};
