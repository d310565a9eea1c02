//! Fetching stored inferences, filtered by a feedback metric.

use crate::error::{TrainingError, TrainingResult};
use crate::record::{EpisodeId, InferenceRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::debug;

/// How a metric value must compare for an inference to be kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Comparison {
    Gte(f64),
    Lte(f64),
    Is(bool),
}

/// Whether feedback for a metric is given per inference or per episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricLevel {
    #[default]
    Inference,
    Episode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFilter {
    pub metric_name: String,
    pub comparison: Comparison,
    #[serde(default)]
    pub level: MetricLevel,
}

impl MetricFilter {
    #[must_use]
    pub fn matches(&self, value: &FeedbackValue) -> bool {
        match (self.comparison, value) {
            (Comparison::Gte(threshold), FeedbackValue::Float(v)) => *v >= threshold,
            (Comparison::Lte(threshold), FeedbackValue::Float(v)) => *v <= threshold,
            (Comparison::Is(expected), FeedbackValue::Boolean(v)) => *v == expected,
            _ => false,
        }
    }
}

/// A feedback value attached to an inference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeedbackValue {
    Boolean(bool),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceQuery {
    pub function_name: String,
    #[serde(default)]
    pub variant_name: Option<String>,
    #[serde(default)]
    pub filter: Option<MetricFilter>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl InferenceQuery {
    #[must_use]
    pub fn new(function_name: impl Into<String>) -> Self {
        Self { function_name: function_name.into(), variant_name: None, filter: None, limit: None }
    }
}

#[async_trait]
pub trait InferenceSource: Send + Sync {
    async fn fetch(&self, query: &InferenceQuery) -> TrainingResult<Vec<InferenceRecord>>;
}

/// One row of a local inference export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredInference {
    pub function_name: String,
    pub variant_name: String,
    #[serde(flatten)]
    pub record: InferenceRecord,
    #[serde(default)]
    pub feedback: BTreeMap<String, FeedbackValue>,
}

impl StoredInference {
    /// Function, variant and inference-level feedback all match `query`.
    #[must_use]
    pub fn matches(&self, query: &InferenceQuery) -> bool {
        if !self.is_selected_by(query) {
            return false;
        }
        match &query.filter {
            Some(filter) => self.feedback.get(&filter.metric_name).is_some_and(|v| filter.matches(v)),
            None => true,
        }
    }

    fn is_selected_by(&self, query: &InferenceQuery) -> bool {
        self.function_name == query.function_name
            && query.variant_name.as_ref().is_none_or(|v| *v == self.variant_name)
    }
}

/// Episode-level feedback for `metric_name`: the last row of an episode that
/// carries the metric wins.
fn episode_feedback(rows: &[StoredInference], metric_name: &str) -> HashMap<EpisodeId, FeedbackValue> {
    rows.iter()
        .filter_map(|row| row.feedback.get(metric_name).map(|v| (row.record.episode_id.clone(), *v)))
        .collect()
}

/// Reads inferences from a JSONL export, one [`StoredInference`] per line.
#[derive(Debug, Clone)]
pub struct JsonlInferenceSource {
    path: PathBuf,
}

impl JsonlInferenceSource {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl InferenceSource for JsonlInferenceSource {
    async fn fetch(&self, query: &InferenceQuery) -> TrainingResult<Vec<InferenceRecord>> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let limit = query.limit.unwrap_or(usize::MAX);

        let mut rows = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let row: StoredInference = serde_json::from_str(line).map_err(|e| {
                TrainingError::Dataset(format!("{}:{}: {}", self.path.display(), idx + 1, e))
            })?;
            rows.push(row);
        }

        let by_episode = match &query.filter {
            Some(filter) if filter.level == MetricLevel::Episode => {
                Some((filter, episode_feedback(&rows, &filter.metric_name)))
            }
            _ => None,
        };

        let mut out = Vec::new();
        for row in rows {
            if out.len() >= limit {
                break;
            }
            let keep = match &by_episode {
                Some((filter, feedback)) => {
                    row.is_selected_by(query) && feedback.get(&row.record.episode_id).is_some_and(|v| filter.matches(v))
                }
                None => row.matches(query),
            };
            if keep {
                out.push(row.record);
            }
        }

        debug!(path = %self.path.display(), fetched = out.len(), "Read inferences from export");
        Ok(out)
    }
}
