//! # agentloop-core
//!
//! Provider-agnostic agent loop with a pluggable tool registry and a
//! normalized model response.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Agent                              │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────────┐  │
//! │  │  Reasoning  │  │    Tool     │  │   LanguageModel      │  │
//! │  │    Loop     │──│  Registry   │──│   (ModelAdapter)     │  │
//! │  └──────┬──────┘  └─────────────┘  └──────────┬───────────┘  │
//! │         │                                     │              │
//! │  ┌──────┴──────┐                    ┌─────────┴──────────┐   │
//! │  │  Message    │                    │ wire::{openai,     │   │
//! │  │  Manager    │                    │ anthropic, gemini} │   │
//! │  └─────────────┘                    └─────────┬──────────┘   │
//! └───────────────────────────────────────────────┼──────────────┘
//!                                                 │
//!                                           dyn Transport
//! ```
//!
//! The agent sees only [`LanguageModel`]. Provider differences live in the
//! pure functions under [`wire`]; the network lives behind [`Transport`],
//! which the runtime crate implements over HTTP.

pub mod error;
pub mod events;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod response;
pub mod tool;
pub mod wire;

pub use error::{AgentError, Result};
pub use events::{AgentEvent, AgentObserver, ChannelObserver, TracingObserver};
pub use message::{Message, MessageManager, Role, ToolResultEntry};
pub use provider::{LanguageModel, ModelAdapter, ModelConfig, Provider, ProviderRequest, Transport};
pub use reasoning::{
    Agent, AgentBuilder, AgentConfig, AgentResponse, RunMetadata, StopReason, ToolCallRecord,
    ToolFailurePolicy,
};
pub use response::{ModelResponse, ResponseMetadata, TokenUsage};
pub use tool::{
    CalculatorTool, DateTimeTool, GetWeatherTool, Tool, ToolCall, ToolDefinition, ToolOutput,
    ToolRegistry, ToolResult,
};
