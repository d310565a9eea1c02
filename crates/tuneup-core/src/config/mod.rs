//! Project configuration: functions, metrics and export settings.
//!
//! A project file looks like:
//!
//! ```toml
//! [functions.extract_entities.variants.baseline]
//! model = "openai::gpt-4o-mini"
//! system_template = "functions/extract_entities/system.minijinja"
//!
//! [metrics.exact_match]
//! type = "boolean"
//! optimize = "max"
//!
//! [export]
//! function_name = "extract_entities"
//! metric_name = "exact_match"
//! template_variant = "baseline"
//! ```

pub mod cli_config;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tuneup_training::job::AdapterSize;
use tuneup_training::{Comparison, InferenceQuery, MetricFilter, PollOptions, TuningHyperParams};
pub use tuneup_training::MetricLevel;

pub use cli_config::{CliConfig, CliConfigError};

/// Errors raised while loading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Unknown variant `{variant}` for function `{function}`")]
    UnknownVariant { function: String, variant: String },

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantConfig {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system_template: Option<String>,
    #[serde(default)]
    pub user_template: Option<String>,
    #[serde(default)]
    pub assistant_template: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionConfig {
    #[serde(default)]
    pub variants: BTreeMap<String, VariantConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Boolean,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Optimize {
    Max,
    Min,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    #[serde(rename = "type")]
    pub kind: MetricType,
    pub optimize: Optimize,
    #[serde(default)]
    pub level: MetricLevel,
}

impl MetricConfig {
    /// Filter keeping inferences that are good according to this metric.
    ///
    /// Float metrics compare against `threshold` in the optimization direction;
    /// boolean metrics keep `true` when maximizing and `false` when minimizing.
    #[must_use]
    pub fn filter(&self, metric_name: &str, threshold: f64) -> MetricFilter {
        let comparison = match (self.kind, self.optimize) {
            (MetricType::Float, Optimize::Max) => Comparison::Gte(threshold),
            (MetricType::Float, Optimize::Min) => Comparison::Lte(threshold),
            (MetricType::Boolean, Optimize::Max) => Comparison::Is(true),
            (MetricType::Boolean, Optimize::Min) => Comparison::Is(false),
        };
        MetricFilter { metric_name: metric_name.to_string(), comparison, level: self.level }
    }
}

/// Run settings for an export / tuning job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub function_name: Option<String>,
    pub metric_name: Option<String>,
    pub template_variant: Option<String>,
    pub threshold: f64,
    pub max_samples: usize,
    pub val_fraction: f64,
    pub seed: u64,
    pub base_model: String,
    pub project_id: Option<String>,
    pub region: String,
    pub bucket: Option<String>,
    pub object_prefix: String,
    pub tuned_model_name: Option<String>,
    pub epochs: Option<u32>,
    pub learning_rate_multiplier: Option<f64>,
    pub adapter_size: Option<AdapterSize>,
    pub poll_interval_secs: u64,
    pub max_wait_secs: u64,
    pub max_polls: Option<u32>,
    /// Cancel the remote job when polling gives up.
    pub cancel_on_timeout: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            function_name: None,
            metric_name: None,
            template_variant: None,
            threshold: 0.5,
            max_samples: 100_000,
            val_fraction: 0.2,
            seed: 42,
            base_model: "gemini-2.0-flash-lite-001".to_string(),
            project_id: None,
            region: "us-central1".to_string(),
            bucket: None,
            object_prefix: "tuneup".to_string(),
            tuned_model_name: None,
            epochs: None,
            learning_rate_multiplier: None,
            adapter_size: None,
            poll_interval_secs: 10,
            max_wait_secs: 12 * 60 * 60,
            max_polls: None,
            cancel_on_timeout: false,
        }
    }
}

impl ExportSettings {
    #[must_use]
    pub fn poll_options(&self) -> PollOptions {
        PollOptions {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_wait: Duration::from_secs(self.max_wait_secs),
            max_polls: self.max_polls,
        }
    }

    #[must_use]
    pub fn hyperparams(&self) -> TuningHyperParams {
        TuningHyperParams {
            epochs: self.epochs,
            learning_rate_multiplier: self.learning_rate_multiplier,
            adapter_size: self.adapter_size,
        }
    }

    /// Apply command-line overrides; `Some` values win.
    pub fn apply(&mut self, overrides: ExportOverrides) {
        if overrides.function_name.is_some() {
            self.function_name = overrides.function_name;
        }
        if overrides.metric_name.is_some() {
            self.metric_name = overrides.metric_name;
        }
        if overrides.template_variant.is_some() {
            self.template_variant = overrides.template_variant;
        }
        if let Some(threshold) = overrides.threshold {
            self.threshold = threshold;
        }
        if let Some(max_samples) = overrides.max_samples {
            self.max_samples = max_samples;
        }
        if let Some(val_fraction) = overrides.val_fraction {
            self.val_fraction = val_fraction;
        }
        if let Some(seed) = overrides.seed {
            self.seed = seed;
        }
        if let Some(max_wait_secs) = overrides.max_wait_secs {
            self.max_wait_secs = max_wait_secs;
        }
        if overrides.cancel_on_timeout {
            self.cancel_on_timeout = true;
        }
    }
}

/// Values that may override [`ExportSettings`] from the command line.
#[derive(Debug, Clone, Default)]
pub struct ExportOverrides {
    pub function_name: Option<String>,
    pub metric_name: Option<String>,
    pub template_variant: Option<String>,
    pub threshold: Option<f64>,
    pub max_samples: Option<usize>,
    pub val_fraction: Option<f64>,
    pub seed: Option<u64>,
    pub max_wait_secs: Option<u64>,
    pub cancel_on_timeout: bool,
}

/// Targets for the scheduled batch smoke test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmokeSettings {
    pub function_name: String,
    pub variants: Vec<String>,
}

impl Default for SmokeSettings {
    fn default() -> Self {
        Self {
            function_name: "batch_smoke".to_string(),
            variants: vec!["openai".to_string(), "anthropic".to_string(), "gcp_vertex_gemini".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionConfig>,
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricConfig>,
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub smoke: SmokeSettings,
}

/// Export settings checked against the project's functions and metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedExport {
    pub function_name: String,
    pub variant_name: String,
    pub variant: VariantConfig,
    pub metric_name: Option<String>,
    pub filter: Option<MetricFilter>,
    pub settings: ExportSettings,
}

impl ResolvedExport {
    #[must_use]
    pub fn query(&self) -> InferenceQuery {
        InferenceQuery {
            function_name: self.function_name.clone(),
            variant_name: None,
            filter: self.filter.clone(),
            limit: Some(self.settings.max_samples),
        }
    }
}

impl ProjectConfig {
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::ParseError(msg) => ConfigError::ParseError(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Check that the configured function, variant and metric exist.
    pub fn resolve(&self) -> ConfigResult<ResolvedExport> {
        let settings = self.export.clone();

        let function_name = settings
            .function_name
            .clone()
            .ok_or_else(|| ConfigError::InvalidValue("export.function_name is required".to_string()))?;
        let function = self
            .functions
            .get(&function_name)
            .ok_or_else(|| ConfigError::UnknownFunction(function_name.clone()))?;

        let variant_name = settings
            .template_variant
            .clone()
            .ok_or_else(|| ConfigError::InvalidValue("export.template_variant is required".to_string()))?;
        let variant = function.variants.get(&variant_name).cloned().ok_or_else(|| ConfigError::UnknownVariant {
            function: function_name.clone(),
            variant: variant_name.clone(),
        })?;

        let filter = match &settings.metric_name {
            Some(metric_name) => {
                let metric = self
                    .metrics
                    .get(metric_name)
                    .ok_or_else(|| ConfigError::UnknownMetric(metric_name.clone()))?;
                Some(metric.filter(metric_name, settings.threshold))
            }
            None => None,
        };

        if !settings.val_fraction.is_finite() || settings.val_fraction <= 0.0 || settings.val_fraction >= 1.0 {
            return Err(ConfigError::InvalidValue(format!(
                "export.val_fraction must be in (0, 1), got {}",
                settings.val_fraction
            )));
        }
        if settings.max_samples == 0 {
            return Err(ConfigError::InvalidValue("export.max_samples must be >= 1".to_string()));
        }
        if settings.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue("export.poll_interval_secs must be >= 1".to_string()));
        }

        Ok(ResolvedExport {
            function_name,
            variant_name,
            variant,
            metric_name: settings.metric_name.clone(),
            filter,
            settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PROJECT: &str = r#"
[functions.extract.variants.baseline]
model = "openai::gpt-4o-mini"
system_template = "functions/extract/system.minijinja"
user_template = "functions/extract/user.minijinja"

[metrics.accuracy]
type = "float"
optimize = "max"

[metrics.hallucinated]
type = "boolean"
optimize = "min"
level = "episode"

[export]
function_name = "extract"
metric_name = "accuracy"
template_variant = "baseline"
threshold = 0.8
val_fraction = 0.25
bucket = "my-bucket"
"#;

    #[test]
    fn test_resolve_builds_query_with_filter() {
        let config = ProjectConfig::from_toml(PROJECT).unwrap();
        let resolved = config.resolve().unwrap();

        assert_eq!(resolved.function_name, "extract");
        assert_eq!(resolved.variant.user_template.as_deref(), Some("functions/extract/user.minijinja"));
        let query = resolved.query();
        assert_eq!(query.limit, Some(100_000));
        assert_eq!(
            query.filter,
            Some(MetricFilter {
                metric_name: "accuracy".to_string(),
                comparison: Comparison::Gte(0.8),
                level: MetricLevel::Inference,
            })
        );
        assert_eq!(resolved.settings.val_fraction, 0.25);
        assert_eq!(resolved.settings.bucket.as_deref(), Some("my-bucket"));
    }

    #[test]
    fn test_filter_direction_follows_metric() {
        let float_min = MetricConfig { kind: MetricType::Float, optimize: Optimize::Min, level: MetricLevel::Inference };
        assert_eq!(float_min.filter("m", 0.3).comparison, Comparison::Lte(0.3));

        let bool_max = MetricConfig { kind: MetricType::Boolean, optimize: Optimize::Max, level: MetricLevel::Episode };
        assert_eq!(bool_max.filter("m", 0.3).comparison, Comparison::Is(true));

        let config = ProjectConfig::from_toml(PROJECT).unwrap();
        assert_eq!(config.metrics["hallucinated"].filter("hallucinated", 0.5).comparison, Comparison::Is(false));
        assert_eq!(config.metrics["hallucinated"].level, MetricLevel::Episode);
        assert_eq!(config.metrics["hallucinated"].filter("hallucinated", 0.5).level, MetricLevel::Episode);
    }

    #[test]
    fn test_missing_references_are_configuration_errors() {
        let mut config = ProjectConfig::from_toml(PROJECT).unwrap();

        config.export.function_name = Some("nope".to_string());
        assert!(matches!(config.resolve(), Err(ConfigError::UnknownFunction(_))));

        config.export.function_name = Some("extract".to_string());
        config.export.template_variant = Some("missing".to_string());
        assert!(matches!(config.resolve(), Err(ConfigError::UnknownVariant { .. })));

        config.export.template_variant = Some("baseline".to_string());
        config.export.metric_name = Some("latency".to_string());
        assert!(matches!(config.resolve(), Err(ConfigError::UnknownMetric(_))));

        config.export.metric_name = None;
        assert!(config.resolve().unwrap().filter.is_none());

        config.export.function_name = None;
        assert!(matches!(config.resolve(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_invalid_val_fraction_is_rejected() {
        let mut config = ProjectConfig::from_toml(PROJECT).unwrap();
        config.export.val_fraction = 1.0;
        assert!(matches!(config.resolve(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_overrides_win() {
        let mut settings = ExportSettings::default();
        settings.apply(ExportOverrides {
            function_name: Some("f".to_string()),
            threshold: Some(0.9),
            seed: Some(7),
            cancel_on_timeout: true,
            ..Default::default()
        });
        assert_eq!(settings.function_name.as_deref(), Some("f"));
        assert!(settings.cancel_on_timeout);
        assert_eq!(settings.threshold, 0.9);
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.val_fraction, 0.2);
    }

    #[test]
    fn test_load_from_file_reports_missing_and_malformed() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("tuneup.toml");
        assert!(matches!(ProjectConfig::load_from_file(&missing), Err(ConfigError::NotFound(_))));

        std::fs::write(&missing, "[metrics.x]\ntype = \"percent\"\noptimize = \"max\"\n").unwrap();
        assert!(matches!(ProjectConfig::load_from_file(&missing), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_smoke_defaults_cover_three_providers() {
        let config = ProjectConfig::from_toml("").unwrap();
        assert_eq!(config.smoke.variants.len(), 3);
        assert_eq!(config.export.poll_options().interval, Duration::from_secs(10));
    }
}
