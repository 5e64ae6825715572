//! Conversation Messages
//!
//! Immutable message values and the bounded conversation history that
//! is fed to the model on every iteration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result
    Tool,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a conversation
///
/// Serializes to the flat record handed to model adapters: `role`,
/// `content`, then every metadata key at the top level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
    #[serde(flatten)]
    metadata: Map<String, Value>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>, metadata: Map<String, Value>) -> Self {
        Self {
            role,
            content: content.into(),
            metadata,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, Map::new())
    }

    /// Create an assistant message
    ///
    /// When the assistant requested tools, `metadata` carries them under
    /// `tool_calls`.
    pub fn assistant(content: impl Into<String>, metadata: Map<String, Value>) -> Self {
        Self::new(Role::Assistant, content, metadata)
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content, Map::new())
    }

    /// Create a tool result message
    pub fn tool(
        content: impl Into<String>,
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let mut metadata = Map::new();
        metadata.insert("tool_call_id".into(), Value::String(tool_call_id.into()));
        metadata.insert("name".into(), Value::String(name.into()));
        Self::new(Role::Tool, content, metadata)
    }

    pub const fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub const fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Tool call ID (tool messages only)
    pub fn tool_call_id(&self) -> Option<&str> {
        self.metadata.get("tool_call_id").and_then(Value::as_str)
    }

    /// Tool name (tool messages only)
    pub fn tool_name(&self) -> Option<&str> {
        self.metadata.get("name").and_then(Value::as_str)
    }

    /// Provider-agnostic record with metadata flattened next to role/content
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("role".into(), Value::String(self.role.as_str().into()));
        record.insert("content".into(), Value::String(self.content.clone()));
        for (key, value) in &self.metadata {
            record.insert(key.clone(), value.clone());
        }
        record
    }
}

/// One tool outcome destined for a `tool`-role message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResultEntry {
    pub tool_call_id: String,
    pub name: String,
    pub content: String,
}

/// Ordered conversation history with an optional sliding window
///
/// Every mutation appends, then drops from the oldest end until the
/// history fits `max_messages`. System messages are not exempt.
#[derive(Clone, Debug, Default)]
pub struct MessageManager {
    messages: Vec<Message>,
    max_messages: Option<usize>,
    /// Carried for configuration parity; no tokenizer is applied.
    max_tokens: Option<u32>,
}

impl MessageManager {
    pub const fn new(max_messages: Option<usize>, max_tokens: Option<u32>) -> Self {
        Self {
            messages: Vec::new(),
            max_messages,
            max_tokens,
        }
    }

    /// History with no window
    pub const fn unbounded() -> Self {
        Self::new(None, None)
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) -> &mut Self {
        self.messages.push(Message::user(content));
        self.trim_if_needed();
        self
    }

    pub fn add_assistant_message(
        &mut self,
        content: impl Into<String>,
        metadata: Map<String, Value>,
    ) -> &mut Self {
        self.messages.push(Message::assistant(content, metadata));
        self.trim_if_needed();
        self
    }

    pub fn add_system_message(&mut self, content: impl Into<String>) -> &mut Self {
        self.messages.push(Message::system(content));
        self.trim_if_needed();
        self
    }

    /// Append one tool message per entry, in order, then trim once
    pub fn add_tool_results<I>(&mut self, results: I) -> &mut Self
    where
        I: IntoIterator<Item = ToolResultEntry>,
    {
        self.messages.extend(
            results
                .into_iter()
                .map(|r| Message::tool(r.content, r.tool_call_id, r.name)),
        );
        self.trim_if_needed();
        self
    }

    /// All retained messages, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Retained messages as flat records
    pub fn messages_array(&self) -> Vec<Map<String, Value>> {
        self.messages.iter().map(Message::to_record).collect()
    }

    pub const fn max_messages(&self) -> Option<usize> {
        self.max_messages
    }

    pub const fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn trim_if_needed(&mut self) {
        let Some(max) = self.max_messages else {
            return;
        };
        if self.messages.len() > max {
            let excess = self.messages.len() - max;
            self.messages.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role(), Role::User);
        assert_eq!(msg.content(), "Hello");
        assert!(msg.metadata().is_empty());
    }

    #[test]
    fn test_tool_message_record_is_flat() {
        let msg = Message::tool("{\"temp\":20}", "call_1", "get_weather");
        let record = msg.to_record();

        assert_eq!(record["role"], "tool");
        assert_eq!(record["content"], "{\"temp\":20}");
        assert_eq!(record["tool_call_id"], "call_1");
        assert_eq!(record["name"], "get_weather");
        assert_eq!(msg.tool_call_id(), Some("call_1"));
    }

    #[test]
    fn test_window_drops_oldest() {
        let mut manager = MessageManager::new(Some(5), None);
        manager
            .add_user_message("u1")
            .add_assistant_message("a1", Map::new())
            .add_system_message("s1")
            .add_user_message("u2")
            .add_assistant_message("a2", Map::new())
            .add_user_message("u3");

        let contents: Vec<&str> = manager.messages().iter().map(Message::content).collect();
        assert_eq!(contents, vec!["a1", "s1", "u2", "a2", "u3"]);
    }

    #[test]
    fn test_window_length_is_min_of_appends_and_limit() {
        for appends in 0..12 {
            let mut manager = MessageManager::new(Some(4), Some(100));
            for i in 0..appends {
                manager.add_user_message(i.to_string());
            }
            assert_eq!(manager.len(), appends.min(4));

            let expected: Vec<String> = (appends.saturating_sub(4)..appends)
                .map(|i| i.to_string())
                .collect();
            let actual: Vec<String> = manager
                .messages()
                .iter()
                .map(|m| m.content().to_string())
                .collect();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_system_message_can_be_evicted() {
        let mut manager = MessageManager::new(Some(2), None);
        manager
            .add_system_message("be nice")
            .add_user_message("hi")
            .add_assistant_message("hello", Map::new());

        assert!(manager.messages().iter().all(|m| m.role() != Role::System));
    }

    #[test]
    fn test_tool_results_appended_in_order() {
        let mut manager = MessageManager::new(Some(3), None);
        manager.add_user_message("q");
        manager.add_tool_results((1..=3).map(|i| ToolResultEntry {
            tool_call_id: format!("call_{i}"),
            name: "t".into(),
            content: format!("r{i}"),
        }));

        let ids: Vec<_> = manager
            .messages()
            .iter()
            .filter_map(Message::tool_call_id)
            .collect();
        assert_eq!(ids, vec!["call_1", "call_2", "call_3"]);
        assert_eq!(manager.len(), 3);
    }

    #[test]
    fn test_unbounded_keeps_everything() {
        let mut manager = MessageManager::unbounded();
        for _ in 0..100 {
            manager.add_user_message("x");
        }
        assert_eq!(manager.len(), 100);
        assert_eq!(manager.max_tokens(), None);
    }
}
