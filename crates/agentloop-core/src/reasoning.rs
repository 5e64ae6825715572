//! Reasoning Loop
//!
//! Drives the think/act cycle: ask the model, run whatever tools it
//! requests, feed the results back and repeat until it answers in plain
//! text or the iteration cap is hit.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

use crate::error::{AgentError, Result};
use crate::events::{AgentEvent, AgentObserver};
use crate::message::{MessageManager, ToolResultEntry};
use crate::provider::LanguageModel;
use crate::response::{ModelResponse, ResponseMetadata};
use crate::tool::{Tool, ToolCall, ToolRegistry};

/// Content returned when the iteration cap stops a run
pub const MAX_ITERATIONS_MESSAGE: &str =
    "Maximum iterations reached. The agent stopped to prevent infinite loops.";

/// What to do when a tool raises instead of returning a result
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolFailurePolicy {
    /// Abort the run with [`AgentError::ToolExecution`]
    #[default]
    Abort,
    /// Feed `Error: ...` back to the model and keep going
    Continue,
}

/// Agent configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model invocations per `execute` call
    pub max_iterations: usize,

    /// Log per-tool progress at info level instead of debug
    pub verbose: bool,

    /// Caller-defined metadata, not interpreted by the loop
    #[serde(default)]
    pub metadata: Map<String, Value>,

    #[serde(default)]
    pub tool_failure: ToolFailurePolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            verbose: false,
            metadata: Map::new(),
            tool_failure: ToolFailurePolicy::Abort,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(AgentError::config("max_iterations must be positive"));
        }
        Ok(())
    }
}

/// Why a run ended without a model answer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxIterations,
}

/// One entry in the run's tool-call log
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub iteration: usize,
    pub tool: String,
    pub arguments: Map<String, Value>,
}

/// Metadata describing one `execute` call
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub iterations: usize,
    pub tool_calls: Vec<ToolCallRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_metadata: Option<ResponseMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_reason: Option<StopReason>,
}

/// Final result of an agent run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub content: String,
    pub metadata: RunMetadata,
}

impl AgentResponse {
    pub fn content(&self) -> &str {
        &self.content
    }

    pub const fn iterations(&self) -> usize {
        self.metadata.iterations
    }

    pub fn tool_calls(&self) -> &[ToolCallRecord] {
        &self.metadata.tool_calls
    }

    pub const fn stopped_reason(&self) -> Option<StopReason> {
        self.metadata.stopped_reason
    }

    pub const fn model_metadata(&self) -> Option<&ResponseMetadata> {
        self.metadata.model_metadata.as_ref()
    }

    pub const fn is_capped(&self) -> bool {
        matches!(self.metadata.stopped_reason, Some(StopReason::MaxIterations))
    }
}

/// Loop states between model calls
enum LoopState {
    Thinking,
    Dispatching(ModelResponse),
    Responding(ModelResponse),
    Capped,
}

/// Per-run counters, reset on every `execute`
struct RunState {
    iteration: usize,
    tool_calls: Vec<ToolCallRecord>,
    tools_executed: usize,
    started: Instant,
}

impl RunState {
    fn new() -> Self {
        Self {
            iteration: 0,
            tool_calls: Vec::new(),
            tools_executed: 0,
            started: Instant::now(),
        }
    }
}

/// The main Agent struct
///
/// Owns its conversation; `execute` takes `&mut self`, so one agent can
/// never run two loops over the same history at once.
pub struct Agent {
    name: String,
    model: Arc<dyn LanguageModel>,
    tools: Arc<ToolRegistry>,
    messages: MessageManager,
    config: AgentConfig,
    observer: Option<Arc<dyn AgentObserver>>,
}

impl Agent {
    /// Create a new agent, rejecting an invalid configuration
    pub fn new(
        name: impl Into<String>,
        model: Arc<dyn LanguageModel>,
        tools: Arc<ToolRegistry>,
        messages: MessageManager,
        config: AgentConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            model,
            tools,
            messages,
            config,
            observer: None,
        })
    }

    /// Attach a lifecycle observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn AgentObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run the agent on a user message
    ///
    /// Conversation history accumulates across calls; iteration count and
    /// the tool-call log start fresh each time.
    pub async fn execute(&mut self, input: impl Into<String>) -> Result<AgentResponse> {
        let input = input.into();
        let mut run = RunState::new();

        self.emit(|name| AgentEvent::Started {
            agent: name.into(),
            input: input.clone(),
            at: chrono::Utc::now(),
        });

        match self.run_loop(input, &mut run).await {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::error!(agent = %self.name, iteration = run.iteration, error = %e, "Agent execution failed");
                self.emit(|name| AgentEvent::Failed {
                    agent: name.into(),
                    error: e.to_string(),
                    at: chrono::Utc::now(),
                });
                Err(e)
            }
        }
    }

    async fn run_loop(&mut self, input: String, run: &mut RunState) -> Result<AgentResponse> {
        self.messages.add_user_message(input);

        let mut state = LoopState::Thinking;
        loop {
            state = match state {
                LoopState::Thinking => {
                    run.iteration += 1;
                    if run.iteration > self.config.max_iterations {
                        LoopState::Capped
                    } else {
                        let response = self.think(run.iteration).await?;
                        if response.has_tool_calls() {
                            LoopState::Dispatching(response)
                        } else {
                            LoopState::Responding(response)
                        }
                    }
                }
                LoopState::Dispatching(response) => {
                    self.dispatch_tools(&response, run).await?;
                    LoopState::Thinking
                }
                LoopState::Responding(response) => return Ok(self.respond(response, run)),
                LoopState::Capped => {
                    tracing::warn!(
                        agent = %self.name,
                        max_iterations = self.config.max_iterations,
                        "Iteration cap reached"
                    );
                    let response = AgentResponse {
                        content: MAX_ITERATIONS_MESSAGE.into(),
                        metadata: RunMetadata {
                            iterations: run.iteration,
                            tool_calls: std::mem::take(&mut run.tool_calls),
                            model_metadata: None,
                            stopped_reason: Some(StopReason::MaxIterations),
                        },
                    };
                    self.completed(run);
                    return Ok(response);
                }
            };
        }
    }

    /// One model invocation over the full history
    async fn think(&self, iteration: usize) -> Result<ModelResponse> {
        let definitions = self.tools.definitions();

        self.emit(|name| AgentEvent::Thinking {
            agent: name.into(),
            iteration,
            message_count: self.messages.len(),
            has_tools: !definitions.is_empty(),
        });
        tracing::debug!(agent = %self.name, iteration, messages = self.messages.len(), "Thinking");

        self.model
            .generate(self.messages.messages(), &definitions)
            .await
    }

    /// Run every requested tool in order, then record the exchange
    async fn dispatch_tools(&mut self, response: &ModelResponse, run: &mut RunState) -> Result<()> {
        let mut results = Vec::with_capacity(response.tool_calls().len());

        for call in response.tool_calls() {
            run.tool_calls.push(ToolCallRecord {
                iteration: run.iteration,
                tool: call.name.clone(),
                arguments: call.arguments.clone(),
            });

            let content = self.run_tool(call, run).await?;
            results.push(ToolResultEntry {
                tool_call_id: call.id.clone(),
                name: call.name.clone(),
                content,
            });
        }

        let requested: Vec<Value> = response.tool_calls().iter().map(ToolCall::to_record).collect();
        let mut metadata = Map::new();
        metadata.insert("tool_calls".into(), Value::Array(requested));

        self.messages
            .add_assistant_message(response.content().unwrap_or_default(), metadata);
        self.messages.add_tool_results(results);
        Ok(())
    }

    /// Execute one call and return the content for its tool message
    async fn run_tool(&self, call: &ToolCall, run: &mut RunState) -> Result<String> {
        self.emit(|name| AgentEvent::ToolExecuting {
            agent: name.into(),
            tool: call.name.clone(),
            arguments: call.arguments.clone(),
            at: chrono::Utc::now(),
        });
        self.progress(&format!(
            "Calling tool: {} with arguments: {}",
            call.name,
            Value::Object(call.arguments.clone())
        ));

        let started = Instant::now();
        match self.tools.execute(&call.name, &call.arguments).await {
            Ok(output) => {
                run.tools_executed += 1;
                self.emit(|name| AgentEvent::ToolExecuted {
                    agent: name.into(),
                    tool: call.name.clone(),
                    success: output.is_success(),
                    elapsed: started.elapsed(),
                });

                let content = output.to_content();
                self.progress(&format!("Tool result: {content}"));
                Ok(content)
            }
            Err(source) => {
                let content = format!("Error: {source}");
                let error = AgentError::ToolExecution {
                    tool: call.name.clone(),
                    arguments: call.arguments.clone(),
                    source: Box::new(source),
                };

                match self.config.tool_failure {
                    ToolFailurePolicy::Abort => Err(error),
                    ToolFailurePolicy::Continue => {
                        tracing::warn!(agent = %self.name, error = %error, "Tool failed, continuing");
                        self.emit(|name| AgentEvent::ToolExecuted {
                            agent: name.into(),
                            tool: call.name.clone(),
                            success: false,
                            elapsed: started.elapsed(),
                        });
                        self.progress(&format!("Tool result: {content}"));
                        Ok(content)
                    }
                }
            }
        }
    }

    fn respond(&mut self, response: ModelResponse, run: &mut RunState) -> AgentResponse {
        let content = response.content.unwrap_or_default();
        self.messages.add_assistant_message(content.clone(), Map::new());

        self.emit(|name| AgentEvent::Responding {
            agent: name.into(),
            content: content.clone(),
            at: chrono::Utc::now(),
        });

        let agent_response = AgentResponse {
            content,
            metadata: RunMetadata {
                iterations: run.iteration,
                tool_calls: std::mem::take(&mut run.tool_calls),
                model_metadata: Some(response.metadata),
                stopped_reason: None,
            },
        };

        self.completed(run);
        agent_response
    }

    fn completed(&self, run: &RunState) {
        self.emit(|name| AgentEvent::Completed {
            agent: name.into(),
            iterations: run.iteration,
            tools_executed: run.tools_executed,
            elapsed: run.started.elapsed(),
        });
    }

    fn emit(&self, build: impl FnOnce(&str) -> AgentEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(&build(&self.name));
        }
    }

    fn progress(&self, line: &str) {
        if self.config.verbose {
            tracing::info!(agent = %self.name, "{line}");
        } else {
            tracing::debug!(agent = %self.name, "{line}");
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Conversation history
    pub const fn messages(&self) -> &MessageManager {
        &self.messages
    }

    /// Conversation history, e.g. to seed a system prompt between runs
    pub const fn messages_mut(&mut self) -> &mut MessageManager {
        &mut self.messages
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    name: String,
    model: Option<Arc<dyn LanguageModel>>,
    tools: ToolRegistry,
    shared_tools: Option<Arc<ToolRegistry>>,
    max_messages: Option<usize>,
    max_tokens: Option<u32>,
    system_prompt: Option<String>,
    config: AgentConfig,
    observer: Option<Arc<dyn AgentObserver>>,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            name: "agent".into(),
            model: None,
            tools: ToolRegistry::new(),
            shared_tools: None,
            max_messages: None,
            max_tokens: None,
            system_prompt: None,
            config: AgentConfig::default(),
            observer: None,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    #[must_use]
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    /// Use a prebuilt registry; tools added with [`Self::tool`] are ignored
    #[must_use]
    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.shared_tools = Some(tools);
        self
    }

    #[must_use]
    pub const fn max_messages(mut self, max: usize) -> Self {
        self.max_messages = Some(max);
        self
    }

    #[must_use]
    pub const fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    #[must_use]
    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    #[must_use]
    pub const fn tool_failure(mut self, policy: ToolFailurePolicy) -> Self {
        self.config.tool_failure = policy;
        self
    }

    #[must_use]
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn AgentObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Result<Agent> {
        let model = self
            .model
            .ok_or_else(|| AgentError::config("Model is required"))?;
        if self.max_messages == Some(0) {
            return Err(AgentError::config("max_messages must be positive"));
        }

        let mut messages = MessageManager::new(self.max_messages, self.max_tokens);
        if let Some(prompt) = self.system_prompt {
            messages.add_system_message(prompt);
        }

        let tools = self.shared_tools.unwrap_or_else(|| Arc::new(self.tools));

        let agent = Agent::new(self.name, model, tools, messages, self.config)?;
        Ok(match self.observer {
            Some(observer) => agent.with_observer(observer),
            None => agent,
        })
    }
}
