//! CLI configuration file support.
//!
//! Provides configuration structure and loading for CLI settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// CLI configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Base URL of the inference gateway
    #[serde(default)]
    pub gateway_url: Option<String>,

    /// Default project configuration file
    #[serde(default)]
    pub project_config: Option<PathBuf>,

    /// Directory for local export runs
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Output format preferences
    #[serde(default)]
    pub output: OutputConfig,

    /// Log level
    #[serde(default)]
    pub log_level: Option<String>,
}

/// Output format configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format (human, json)
    #[serde(default = "default_output_format")]
    pub format: String,

    /// Always use JSON output
    #[serde(default)]
    pub always_json: bool,
}

fn default_output_format() -> String {
    "human".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { format: "human".to_string(), always_json: false }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum CliConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),
}

/// Result type for configuration operations.
pub type CliConfigResult<T> = std::result::Result<T, CliConfigError>;

impl CliConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> CliConfigResult<Self> {
        if !path.exists() {
            return Err(CliConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| CliConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        toml::from_str(&content).map_err(|e| CliConfigError::ParseError(format!("{}: {}", path.display(), e)))
    }

    /// Get default global configuration file path.
    pub fn default_global_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".tuneup")
            .join("config.toml")
    }

    /// Get default local configuration file path.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".tuneuprc")
    }

    /// Discover and load configuration files.
    ///
    /// Local config (./.tuneuprc) overrides global config (~/.tuneup/config.toml).
    pub fn discover_and_load() -> Self {
        let mut config = Self::default();

        if let Ok(global_config) = Self::load_from_file(&Self::default_global_path()) {
            config.merge(&global_config);
        }

        if let Ok(local_config) = Self::load_from_file(&Self::default_local_path()) {
            config.merge(&local_config);
        }

        config
    }

    /// Merge another configuration into this one.
    ///
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &Self) {
        if let Some(ref gateway_url) = other.gateway_url {
            self.gateway_url = Some(gateway_url.clone());
        }
        if let Some(ref project_config) = other.project_config {
            self.project_config = Some(project_config.clone());
        }
        if let Some(ref output_dir) = other.output_dir {
            self.output_dir = Some(output_dir.clone());
        }
        if let Some(ref log_level) = other.log_level {
            self.log_level = Some(log_level.clone());
        }
        if other.output.always_json {
            self.output.always_json = true;
        }
        if other.output.format != "human" {
            self.output.format = other.output.format.clone();
        }
    }

    /// Apply configuration to environment variables if not already set.
    ///
    /// # Safety
    ///
    /// This function modifies environment variables. It should only be called
    /// from single-threaded code before spawning threads.
    #[allow(unsafe_code)]
    pub unsafe fn apply_to_env(&self) {
        if let Some(ref gateway_url) = self.gateway_url {
            if std::env::var("TUNEUP_GATEWAY_URL").is_err() {
                unsafe { std::env::set_var("TUNEUP_GATEWAY_URL", gateway_url) };
            }
        }
        if let Some(ref log_level) = self.log_level {
            if std::env::var("RUST_LOG").is_err() {
                unsafe { std::env::set_var("RUST_LOG", log_level) };
            }
        }
    }

    /// Whether command output should be JSON by default.
    pub fn wants_json(&self) -> bool {
        self.output.always_json || self.output.format == "json"
    }
}
