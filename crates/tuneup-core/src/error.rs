//! Error types for Tuneup Core.

use crate::config::ConfigError;
use thiserror::Error;
use tuneup_training::TrainingError;

/// Core error type for export and tuning runs.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration errors; raised before any network call
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Dataset, upload and tuning errors
    #[error(transparent)]
    Training(#[from] TrainingError),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
