//! Tool System
//!
//! Tools are registered by name before a run and invoked by the agent loop
//! whenever the model asks for them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Tool call request parsed from a model response
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call ID, used to attribute the result back to this request
    pub id: String,

    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Flat `{id, name, arguments}` record
    pub fn to_record(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "arguments": self.arguments,
        })
    }
}

/// Outcome of a tool execution
///
/// `data` is only meaningful when `success` is true, `error` only when it
/// is false.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub data: Value,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(data: impl Into<Value>) -> Self {
        Self {
            data: data.into(),
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            data: Value::Null,
            success: false,
            error: Some(error.into()),
        }
    }
}

impl fmt::Display for ToolResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.success {
            return write!(f, "Error: {}", self.error.as_deref().unwrap_or_default());
        }
        f.write_str(&render_value(&self.data))
    }
}

/// What a tool hands back to the registry
///
/// Anything other than an explicit [`ToolResult`] counts as successful raw
/// data.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolOutput {
    Result(ToolResult),
    Text(String),
    Raw(Value),
}

impl ToolOutput {
    /// Content for the `tool`-role message fed back to the model
    pub fn to_content(&self) -> String {
        match self {
            Self::Result(result) => result.to_string(),
            Self::Text(text) => text.clone(),
            Self::Raw(value) => render_value(value),
        }
    }

    /// Whether the tool reported success
    pub const fn is_success(&self) -> bool {
        match self {
            Self::Result(result) => result.success,
            Self::Text(_) | Self::Raw(_) => true,
        }
    }
}

impl From<ToolResult> for ToolOutput {
    fn from(result: ToolResult) -> Self {
        Self::Result(result)
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        Self::Raw(value)
    }
}

/// Strings pass through, everything else becomes pretty JSON.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| "null".into()),
    }
}

/// Function schema inside a [`ToolDefinition`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Tool definition in the unified `{type: "function", function: {...}}` shape
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            kind: "function".into(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry key; the model addresses the tool by this name
    fn name(&self) -> &str;

    /// Human-readable description (shown to the model)
    fn description(&self) -> &str;

    /// JSON-schema-like parameter description
    fn parameters(&self) -> Value;

    /// Execute the tool with the given arguments
    async fn execute(&self, arguments: &Map<String, Value>) -> anyhow::Result<ToolOutput>;

    /// Definition advertised to the model
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(self.name(), self.description(), self.parameters())
    }
}

/// Registry for available tools
///
/// Names are unique; registering an existing name replaces the tool but
/// keeps its slot in the definition order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> &mut Self {
        self.register_shared(Arc::new(tool))
    }

    /// Register a shared tool
    pub fn register_shared(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
        self
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Definitions for every tool, in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Execute a tool by name
    ///
    /// Failures raised by the tool come back as [`AgentError::Tool`]
    /// untouched; wrapping them is up to the caller.
    pub async fn execute(&self, name: &str, arguments: &Map<String, Value>) -> Result<ToolOutput> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;

        tool.execute(arguments).await.map_err(AgentError::Tool)
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.order).finish()
    }
}

// ============================================================================
// Built-in Tools
// ============================================================================

/// Weather tool - mock conditions for a location
///
/// Values are derived from the location and unit, so repeated calls agree.
pub struct GetWeatherTool;

const CONDITIONS: [&str; 4] = ["sunny", "cloudy", "rainy", "partly cloudy"];

#[async_trait]
impl Tool for GetWeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather for a specific location"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "The city and state, e.g. San Francisco, CA"
                },
                "unit": {
                    "type": "string",
                    "enum": ["celsius", "fahrenheit"],
                    "description": "The unit of temperature"
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> anyhow::Result<ToolOutput> {
        let location = arguments
            .get("location")
            .and_then(Value::as_str)
            .unwrap_or("Unknown");
        let unit = match arguments.get("unit").and_then(Value::as_str) {
            Some("fahrenheit") => "fahrenheit",
            _ => "celsius",
        };

        let seed = location
            .bytes()
            .fold(17_u64, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)));
        let temperature = if unit == "celsius" {
            15 + seed % 16
        } else {
            59 + seed % 28
        };
        let condition = CONDITIONS[usize::try_from(seed % 4).unwrap_or_default()];

        Ok(ToolResult::success(json!({
            "location": location,
            "temperature": temperature,
            "unit": unit,
            "condition": condition,
            "humidity": format!("{}%", 30 + (seed / 7) % 51),
            "wind_speed": format!("{} km/h", 5 + (seed / 13) % 21),
        }))
        .into())
    }
}

/// DateTime tool - returns current time
pub struct DateTimeTool;

#[async_trait]
impl Tool for DateTimeTool {
    fn name(&self) -> &str {
        "datetime"
    }

    fn description(&self) -> &str {
        "Get the current date and time in UTC"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "format": {
                    "type": "string",
                    "enum": ["iso", "human", "unix"],
                    "description": "Output format (default: human)"
                }
            }
        })
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> anyhow::Result<ToolOutput> {
        let now = chrono::Utc::now();

        let output = match arguments.get("format").and_then(Value::as_str) {
            Some("iso") => now.to_rfc3339(),
            Some("unix") => now.timestamp().to_string(),
            _ => now.format("%A, %B %d, %Y at %H:%M:%S UTC").to_string(),
        };

        Ok(ToolOutput::Text(output))
    }
}

/// Calculator tool - evaluates arithmetic expressions
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate a mathematical expression with + - * / ^ and parentheses"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Expression to evaluate (e.g., '2 + 2', '(1 + 2) * 4')"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> anyhow::Result<ToolOutput> {
        let expr = arguments
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("Missing required parameter: expression"))?;

        let result = match evaluate_expression(expr) {
            Ok(value) => ToolResult::success(json!({ "expression": expr, "result": value })),
            Err(e) => ToolResult::failure(e),
        };
        Ok(result.into())
    }
}

/// Nesting limit for parentheses and unary minus.
const MAX_EXPRESSION_DEPTH: usize = 64;

/// Recursive-descent evaluator over `+ - * / ^` and parentheses.
fn evaluate_expression(expr: &str) -> std::result::Result<f64, String> {
    let tokens: Vec<char> = expr.chars().filter(|c| !c.is_whitespace()).collect();
    let mut parser = ExprParser { tokens: &tokens, pos: 0, depth: 0 };
    let value = parser.sum()?;
    if parser.pos != tokens.len() {
        return Err(format!("Unexpected '{}' at position {}", tokens[parser.pos], parser.pos));
    }
    Ok(value)
}

struct ExprParser<'a> {
    tokens: &'a [char],
    pos: usize,
    depth: usize,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<char> {
        self.tokens.get(self.pos).copied()
    }

    fn descend(&mut self) -> std::result::Result<(), String> {
        self.depth += 1;
        if self.depth > MAX_EXPRESSION_DEPTH {
            return Err("Expression nested too deeply".into());
        }
        Ok(())
    }

    fn sum(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.product()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.product()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn product(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.power()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.power()?;
            if op == '/' {
                if rhs == 0.0 {
                    return Err("Division by zero".into());
                }
                value /= rhs;
            } else {
                value *= rhs;
            }
        }
        Ok(value)
    }

    // Right-associative
    fn power(&mut self) -> std::result::Result<f64, String> {
        let base = self.unary()?;
        if self.peek() == Some('^') {
            self.pos += 1;
            let exponent = self.power()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn unary(&mut self) -> std::result::Result<f64, String> {
        if self.peek() == Some('-') {
            self.pos += 1;
            self.descend()?;
            let value = -self.unary()?;
            self.depth -= 1;
            return Ok(value);
        }
        self.atom()
    }

    fn atom(&mut self) -> std::result::Result<f64, String> {
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                self.descend()?;
                let value = self.sum()?;
                if self.peek() != Some(')') {
                    return Err("Missing closing parenthesis".into());
                }
                self.pos += 1;
                self.depth -= 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| c.is_ascii_digit() || c == '.')
                {
                    self.pos += 1;
                }
                let literal: String = self.tokens[start..self.pos].iter().collect();
                literal
                    .parse::<f64>()
                    .map_err(|e| format!("Parse error: {e}"))
            }
            Some(c) => Err(format!("Unexpected '{c}' at position {}", self.pos)),
            None => Err("Unexpected end of expression".into()),
        }
    }
}
