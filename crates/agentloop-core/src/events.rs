//! Lifecycle Events
//!
//! Advisory notifications emitted by the agent loop. Nothing in the loop
//! depends on an observer being attached.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Events emitted during one `execute` call
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentEvent {
    Started {
        agent: String,
        input: String,
        at: DateTime<Utc>,
    },
    /// About to call the model
    Thinking {
        agent: String,
        iteration: usize,
        message_count: usize,
        has_tools: bool,
    },
    ToolExecuting {
        agent: String,
        tool: String,
        arguments: Map<String, Value>,
        at: DateTime<Utc>,
    },
    ToolExecuted {
        agent: String,
        tool: String,
        success: bool,
        elapsed: Duration,
    },
    Responding {
        agent: String,
        content: String,
        at: DateTime<Utc>,
    },
    Completed {
        agent: String,
        iterations: usize,
        tools_executed: usize,
        elapsed: Duration,
    },
    Failed {
        agent: String,
        error: String,
        at: DateTime<Utc>,
    },
}

impl AgentEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Thinking { .. } => "thinking",
            Self::ToolExecuting { .. } => "tool_executing",
            Self::ToolExecuted { .. } => "tool_executed",
            Self::Responding { .. } => "responding",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Receives lifecycle events
pub trait AgentObserver: Send + Sync {
    fn on_event(&self, event: &AgentEvent);
}

/// Forwards events into an unbounded channel
///
/// A dropped receiver is ignored.
pub struct ChannelObserver {
    sender: UnboundedSender<AgentEvent>,
}

impl ChannelObserver {
    pub const fn new(sender: UnboundedSender<AgentEvent>) -> Self {
        Self { sender }
    }
}

impl AgentObserver for ChannelObserver {
    fn on_event(&self, event: &AgentEvent) {
        let _ = self.sender.send(event.clone());
    }
}

/// Logs every event at debug level
#[derive(Default)]
pub struct TracingObserver;

impl AgentObserver for TracingObserver {
    fn on_event(&self, event: &AgentEvent) {
        match event {
            AgentEvent::Failed { agent, error, .. } => {
                tracing::error!(agent = %agent, error = %error, "Agent failed");
            }
            other => {
                tracing::debug!(event = other.name(), payload = ?other, "Agent event");
            }
        }
    }
}
