//! Tuneup Core
//!
//! Project configuration and the workflows built on top of the training and
//! provider crates:
//! - `config`: project and CLI configuration, metric filter derivation
//! - `pipeline`: export and tuning runs
//! - `fragment`: config fragment for a tuned model
//! - `smoke`: scheduled batch inference smoke test

pub mod config;
pub mod error;
pub mod fragment;
pub mod pipeline;
pub mod smoke;

pub use config::{
    CliConfig, CliConfigError, ConfigError, ConfigResult, ExportOverrides, ExportSettings, MetricConfig,
    ProjectConfig, ResolvedExport, SmokeSettings, VariantConfig,
};
pub use error::{CoreError, Result};
pub use fragment::{endpoint_id, render_fragment, FragmentSpec};
pub use pipeline::{
    build_manifest, fragment_for, job_spec, launch_and_wait, prepare_dataset, publish_dataset, run_tuning,
    tuned_model_name, write_local, PreparedDataset, PublishedDataset, TuneOutcome,
};
pub use smoke::{
    random_token, run_smoke_tests, smoke_prompt, smoke_targets, BatchSubmitter, SmokeResult, SmokeSummary, SmokeTarget,
};
