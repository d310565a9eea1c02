use crate::tuning::JobState;
use std::time::Duration;
use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

/// Per-record conversion failure.
///
/// These never abort a batch: `convert_all` counts them and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("invalid arguments for tool call `{name}`: {reason}")]
    InvalidToolArguments { name: String, reason: String },
}

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("invalid tuning job spec: {0}")]
    InvalidSpec(String),

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("split error: {0}")]
    Split(String),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("destination already exists: {0}")]
    DestinationExists(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("tuning job {job} ended in state {state}: {}", .message.as_deref().unwrap_or("no details"))]
    Job { job: String, state: JobState, message: Option<String> },

    #[error("tuning job {job} did not reach a terminal state within {waited:?}")]
    PollTimeout { job: String, waited: Duration },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
