//! Command implementations for the tuneup CLI.

pub mod cancel;
pub mod export;
pub mod fragment;
pub mod smoke;
pub mod status;
pub mod tune;
pub mod types;

use anyhow::{Context, Result};
use std::path::PathBuf;
use tuneup_core::{CliConfig, ExportOverrides, ExportSettings, ProjectConfig, ResolvedExport};
use tuneup_models::{GatewayClient, GcsObjectStore, VertexTuningClient};
use tuneup_training::{
    InferenceSource, JsonlInferenceSource, ProgressSink, StdoutProgressSink, TracingProgressSink,
};

pub const GATEWAY_URL_ENV: &str = "TUNEUP_GATEWAY_URL";
pub const ACCESS_TOKEN_ENV: &str = "TUNEUP_GCP_ACCESS_TOKEN";
pub const VERTEX_URL_ENV: &str = "TUNEUP_VERTEX_URL";
const DEFAULT_GATEWAY_URL: &str = "http://localhost:3000";
const DEFAULT_PROJECT_CONFIG: &str = "tuneup.toml";

/// Settings every command sees, resolved from flags and the CLI config.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub project_config: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub json: bool,
}

impl CommandContext {
    pub fn new(config_flag: Option<PathBuf>, cli_config: &CliConfig) -> Self {
        let project_config = config_flag
            .or_else(|| cli_config.project_config.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROJECT_CONFIG));
        Self { project_config, output_dir: cli_config.output_dir.clone(), json: cli_config.wants_json() }
    }

    pub fn load_project(&self) -> Result<ProjectConfig> {
        ProjectConfig::load_from_file(&self.project_config)
            .with_context(|| format!("Failed to load project config {}", self.project_config.display()))
    }

    /// Load the project config, apply `overrides` and check references.
    pub fn resolve_export(&self, overrides: ExportOverrides) -> Result<ResolvedExport> {
        let mut project = self.load_project()?;
        project.export.apply(overrides);
        project.resolve().context("Invalid export configuration")
    }
}

pub fn gateway_url(flag: Option<&str>) -> String {
    flag.map(str::to_string)
        .or_else(|| std::env::var(GATEWAY_URL_ENV).ok())
        .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string())
}

pub fn inference_source(input: Option<&PathBuf>, gateway: Option<&str>) -> Box<dyn InferenceSource> {
    match input {
        Some(path) => Box::new(JsonlInferenceSource::new(path.clone())),
        None => Box::new(GatewayClient::new(gateway_url(gateway))),
    }
}

pub fn access_token() -> Result<String> {
    std::env::var(ACCESS_TOKEN_ENV)
        .with_context(|| format!("{ACCESS_TOKEN_ENV} is not set. Export a GCP access token (e.g. `gcloud auth print-access-token`)."))
}

pub fn require<'a>(value: Option<&'a String>, key: &str) -> Result<&'a str> {
    value.map(String::as_str).with_context(|| format!("export.{key} is required for this command"))
}

/// Vertex AI client for the configured project; `TUNEUP_VERTEX_URL` replaces
/// the regional endpoint.
pub fn vertex_client(settings: &ExportSettings, token: String) -> Result<VertexTuningClient> {
    let project_id = require(settings.project_id.as_ref(), "project_id")?;
    let client = VertexTuningClient::with_access_token(project_id.to_string(), settings.region.clone(), token);
    Ok(match std::env::var(VERTEX_URL_ENV) {
        Ok(url) => client.with_base_url(url),
        Err(_) => client,
    })
}

/// Poll progress goes to stdout for people and to the log when stdout
/// carries JSON.
pub fn progress_sink(json: bool) -> Box<dyn ProgressSink> {
    if json {
        Box::new(TracingProgressSink)
    } else {
        Box::new(StdoutProgressSink)
    }
}

pub fn gcs_store(settings: &ExportSettings, token: String) -> Result<GcsObjectStore> {
    let bucket = require(settings.bucket.as_ref(), "bucket")?;
    Ok(GcsObjectStore::with_access_token(bucket.to_string(), token))
}
