//! Stored inference records as they come out of the inference store.

use crate::error::ConversionError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier grouping records of one conversation/session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeId(pub String);

impl EpisodeId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Message author. Anything outside this set fails to deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Assistant => f.write_str("assistant"),
            Self::System => f.write_str("system"),
        }
    }
}

/// Tool-call arguments as stored: either a JSON object or a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolArguments {
    Structured(Map<String, Value>),
    Encoded(String),
}

impl ToolArguments {
    /// Normalize to a structured mapping.
    ///
    /// Encoded arguments must parse to a JSON object.
    pub fn normalize(&self, tool_name: &str) -> Result<Map<String, Value>, ConversionError> {
        match self {
            Self::Structured(map) => Ok(map.clone()),
            Self::Encoded(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(other) => Err(ConversionError::InvalidToolArguments {
                    name: tool_name.to_string(),
                    reason: format!("expected a JSON object, got {}", json_kind(&other)),
                }),
                Err(e) => Err(ConversionError::InvalidToolArguments {
                    name: tool_name.to_string(),
                    reason: e.to_string(),
                }),
            },
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One typed block of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    RawText { value: String },
    Thought { text: String },
    ToolCall { name: String, arguments: ToolArguments },
    ToolResult { name: String, result: Value },
    /// Any block type this tool does not understand (files, images, ...).
    #[serde(other)]
    Unknown,
}

impl ContentBlock {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::RawText { .. } => "raw_text",
            Self::Thought { .. } => "thought",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

/// A single logged inference: its input transcript and the model's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRecord {
    pub episode_id: EpisodeId,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub output: Vec<ContentBlock>,
}
