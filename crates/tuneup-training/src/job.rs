use crate::error::{TrainingError, TrainingResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier the tuning service assigned to a job (e.g. its resource name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TuningJobId(pub String);

impl std::fmt::Display for TuningJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Local identifier for one export run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterSize {
    One,
    Four,
    Eight,
    Sixteen,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TuningHyperParams {
    #[serde(default)]
    pub epochs: Option<u32>,
    #[serde(default)]
    pub learning_rate_multiplier: Option<f64>,
    #[serde(default)]
    pub adapter_size: Option<AdapterSize>,
}

impl TuningHyperParams {
    pub fn validate(&self) -> TrainingResult<()> {
        if self.epochs == Some(0) {
            return Err(TrainingError::InvalidSpec("epochs must be >= 1".to_string()));
        }
        if let Some(lr) = self.learning_rate_multiplier {
            if !lr.is_finite() || lr <= 0.0 {
                return Err(TrainingError::InvalidSpec("learning_rate_multiplier must be > 0".to_string()));
            }
        }
        Ok(())
    }
}

/// Everything needed to submit a supervised tuning job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningJobSpec {
    pub run_id: RunId,
    pub created_at: DateTime<Utc>,
    pub base_model: String,
    pub training_dataset_uri: String,
    pub validation_dataset_uri: Option<String>,
    pub tuned_model_display_name: Option<String>,
    #[serde(default)]
    pub hyperparams: TuningHyperParams,
}

impl TuningJobSpec {
    #[must_use]
    pub fn new(base_model: impl Into<String>, training_dataset_uri: impl Into<String>) -> Self {
        Self {
            run_id: RunId::new(),
            created_at: Utc::now(),
            base_model: base_model.into(),
            training_dataset_uri: training_dataset_uri.into(),
            validation_dataset_uri: None,
            tuned_model_display_name: None,
            hyperparams: TuningHyperParams::default(),
        }
    }

    #[must_use]
    pub fn with_validation(mut self, uri: impl Into<String>) -> Self {
        self.validation_dataset_uri = Some(uri.into());
        self
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.tuned_model_display_name = Some(name.into());
        self
    }

    pub fn validate(&self) -> TrainingResult<()> {
        if self.base_model.trim().is_empty() {
            return Err(TrainingError::InvalidSpec("base_model is required".to_string()));
        }
        if self.training_dataset_uri.trim().is_empty() {
            return Err(TrainingError::InvalidSpec("training_dataset_uri is required".to_string()));
        }
        self.hyperparams.validate()?;
        Ok(())
    }
}
