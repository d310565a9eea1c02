use crate::dataset::DatasetId;
use crate::error::TrainingResult;
use crate::job::{RunId, TuningJobId};
use crate::tuning::JobState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionCounts {
    pub fetched: usize,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// One side of the split as it was exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitArtifact {
    pub examples: usize,
    pub episodes: usize,
    pub dataset_id: DatasetId,
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: TuningJobId,
    pub state: JobState,
    #[serde(default)]
    pub tuned_model: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Record of one export run, written next to the exported data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub run_id: RunId,
    pub created_at: DateTime<Utc>,
    pub function_name: String,
    pub template_variant: String,
    #[serde(default)]
    pub metric_name: Option<String>,
    pub counts: ConversionCounts,
    pub val_fraction: f64,
    pub realized_val_fraction: f64,
    pub seed: u64,
    pub train: SplitArtifact,
    pub validation: SplitArtifact,
    #[serde(default)]
    pub job: Option<JobOutcome>,
}

impl ExportManifest {
    pub fn write_to(&self, path: &Path) -> TrainingResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> TrainingResult<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
