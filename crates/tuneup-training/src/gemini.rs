//! Gemini supervised-tuning wire format.
//!
//! One tuning row is `{"contents": [...], "systemInstruction": {...}}` where every
//! content is `{"role": ..., "parts": [...]}`.

use crate::record::{EpisodeId, Role};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeminiRole {
    User,
    Model,
    System,
}

impl From<Role> for GeminiRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Self::User,
            Role::Assistant => Self::Model,
            Role::System => Self::System,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub args: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponse,
    },
}

impl Part {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// A role-tagged turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: GeminiRole,
    pub parts: Vec<Part>,
}

/// A converted inference, ready to be written as one tuning row.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedExample {
    pub turns: Vec<Content>,
    pub system_instruction: Option<Content>,
    pub episode_id: EpisodeId,
}

impl ConvertedExample {
    #[must_use]
    pub fn to_row(&self) -> TuningRow<'_> {
        TuningRow { contents: &self.turns, system_instruction: self.system_instruction.as_ref() }
    }
}

/// The serialized shape of one JSONL line.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningRow<'a> {
    pub contents: &'a [Content],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<&'a Content>,
}

/// Owned counterpart of [`TuningRow`], for reading datasets back.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedTuningRow {
    pub contents: Vec<Content>,
    #[serde(default)]
    pub system_instruction: Option<Content>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_serializes_with_camel_case_keys() {
        let example = ConvertedExample {
            turns: vec![
                Content { role: GeminiRole::User, parts: vec![Part::text("Hi")] },
                Content {
                    role: GeminiRole::Model,
                    parts: vec![Part::FunctionCall {
                        function_call: FunctionCall {
                            name: "lookup".to_string(),
                            args: json!({"q": "x"}).as_object().cloned().unwrap(),
                        },
                    }],
                },
            ],
            system_instruction: Some(Content { role: GeminiRole::System, parts: vec![Part::text("Be concise")] }),
            episode_id: EpisodeId::new("ep"),
        };

        let value = serde_json::to_value(example.to_row()).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "Hi"}]},
                    {"role": "model", "parts": [{"functionCall": {"name": "lookup", "args": {"q": "x"}}}]}
                ],
                "systemInstruction": {"role": "system", "parts": [{"text": "Be concise"}]}
            })
        );
    }

    #[test]
    fn test_row_omits_missing_system_instruction() {
        let example = ConvertedExample {
            turns: vec![Content { role: GeminiRole::Model, parts: vec![Part::text("ok")] }],
            system_instruction: None,
            episode_id: EpisodeId::new("ep"),
        };
        let line = serde_json::to_string(&example.to_row()).unwrap();
        assert!(!line.contains("systemInstruction"));
    }
}
