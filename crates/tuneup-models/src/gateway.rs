//! Inference gateway client: stored-inference queries and batch inference.

use crate::http::{error_from_response, request_error};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};
use tuneup_training::{
    Comparison, EpisodeId, InferenceQuery, InferenceRecord, InferenceSource, TrainingError, TrainingResult,
};

/// Identifiers returned when a batch is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSubmission {
    pub batch_id: String,
    #[serde(default)]
    pub inference_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ListInferencesResponse {
    inferences: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct StoredChatInference {
    episode_id: EpisodeId,
    #[serde(default)]
    input: StoredInput,
    #[serde(default)]
    output: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct StoredInput {
    #[serde(default)]
    system: Option<Value>,
    #[serde(default)]
    messages: Vec<StoredMessage>,
}

#[derive(Debug, Deserialize)]
struct StoredMessage {
    role: Value,
    #[serde(default)]
    content: Vec<Value>,
}

/// Output tool calls carry parsed `arguments` (null when the model emitted
/// invalid JSON) next to `raw_arguments`; fall back to the raw string.
/// Templated text blocks carry `arguments` instead of `text` and become
/// unknown blocks, which conversion skips.
fn normalize_block(mut block: Value) -> Value {
    match block.get("type").and_then(Value::as_str) {
        Some("tool_call") if block.get("arguments").is_none_or(Value::is_null) => {
            if let Some(raw) = block.get("raw_arguments").cloned() {
                block["arguments"] = raw;
            }
        }
        Some("text") if block.get("text").is_none() => {
            block["type"] = json!("template");
        }
        _ => {}
    }
    block
}

fn into_record(raw: Value) -> TrainingResult<Option<InferenceRecord>> {
    let stored: StoredChatInference = serde_json::from_value(raw)?;

    let system = match stored.input.system {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(_) => {
            warn!(episode_id = %stored.episode_id, "Skipping inference with templated system arguments");
            return Ok(None);
        }
    };

    let messages = stored
        .input
        .messages
        .into_iter()
        .map(|m| {
            json!({
                "role": m.role,
                "content": m.content.into_iter().map(normalize_block).collect::<Vec<_>>(),
            })
        })
        .collect::<Vec<_>>();

    let record = json!({
        "episode_id": stored.episode_id,
        "system": system,
        "messages": messages,
        "output": stored.output.into_iter().map(normalize_block).collect::<Vec<_>>(),
    });

    Ok(Some(serde_json::from_value(record)?))
}

/// The gateway resolves a metric's level from its own config, so episode-level
/// filters use the same body shape.
fn filter_body(query: &InferenceQuery) -> Option<Value> {
    let filter = query.filter.as_ref()?;
    Some(match filter.comparison {
        Comparison::Gte(value) => json!({
            "type": "float_metric", "metric_name": filter.metric_name, "value": value, "comparison_operator": ">="
        }),
        Comparison::Lte(value) => json!({
            "type": "float_metric", "metric_name": filter.metric_name, "value": value, "comparison_operator": "<="
        }),
        Comparison::Is(value) => json!({
            "type": "boolean_metric", "metric_name": filter.metric_name, "value": value
        }),
    })
}

pub struct GatewayClient {
    http_client: Client,
    base_url: String,
}

impl GatewayClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { http_client: Client::new(), base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit one user prompt as a batch to `function_name`/`variant_name`.
    pub async fn batch_inference(
        &self,
        function_name: &str,
        variant_name: &str,
        prompts: &[String],
    ) -> TrainingResult<BatchSubmission> {
        let inputs: Vec<Value> = prompts
            .iter()
            .map(|p| json!({ "messages": [{ "role": "user", "content": p }] }))
            .collect();
        let body = json!({
            "function_name": function_name,
            "variant_name": variant_name,
            "inputs": inputs,
        });

        let response = self
            .http_client
            .post(format!("{}/batch_inference", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error("batch inference", &e))?;

        if !response.status().is_success() {
            return Err(error_from_response(response, &format!("batch inference for {variant_name}")).await);
        }

        response
            .json()
            .await
            .map_err(|e| TrainingError::Transport(format!("failed to parse batch inference response: {e}")))
    }
}

#[async_trait]
impl InferenceSource for GatewayClient {
    async fn fetch(&self, query: &InferenceQuery) -> TrainingResult<Vec<InferenceRecord>> {
        let mut body = json!({
            "function_name": query.function_name,
            "output_source": "inference",
        });
        if let Some(variant) = &query.variant_name {
            body["variant_name"] = json!(variant);
        }
        if let Some(filter) = filter_body(query) {
            body["filters"] = filter;
        }
        if let Some(limit) = query.limit {
            body["limit"] = json!(limit);
        }

        let response = self
            .http_client
            .post(format!("{}/v1/inferences/list_inferences", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error("list inferences", &e))?;

        if !response.status().is_success() {
            return Err(error_from_response(response, "list inferences").await);
        }

        let listed: ListInferencesResponse = response
            .json()
            .await
            .map_err(|e| TrainingError::Transport(format!("failed to parse inference list: {e}")))?;

        let fetched = listed.inferences.len();
        let mut records = Vec::with_capacity(fetched);
        for raw in listed.inferences {
            let episode_id = raw.get("episode_id").and_then(Value::as_str).unwrap_or("unknown").to_string();
            match into_record(raw) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => warn!(%episode_id, error = %e, "Skipping stored inference that could not be read"),
            }
        }
        debug!(function = %query.function_name, fetched, usable = records.len(), "Fetched inferences from gateway");
        Ok(records)
    }
}
