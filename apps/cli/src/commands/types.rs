//! Command type definitions shared between main.rs and tests.

use clap::Args;
use std::path::PathBuf;
use tuneup_core::ExportOverrides;

/// Which inferences to export and how to split them.
///
/// Every flag overrides the matching `[export]` key in the project config.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Function whose inferences are exported
    #[arg(long = "function")]
    pub function_name: Option<String>,

    /// Metric used to keep good inferences
    #[arg(long = "metric")]
    pub metric_name: Option<String>,

    /// Variant whose templates the tuned variant inherits
    #[arg(long = "variant")]
    pub template_variant: Option<String>,

    /// Threshold for float metrics
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Maximum number of inferences to fetch
    #[arg(long)]
    pub max_samples: Option<usize>,

    /// Share of episodes held out for validation, in (0, 1)
    #[arg(long)]
    pub val_fraction: Option<f64>,

    /// Seed for the episode shuffle
    #[arg(long)]
    pub seed: Option<u64>,

    /// Read inferences from a local JSONL export instead of the gateway
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Gateway URL (overrides TUNEUP_GATEWAY_URL)
    #[arg(long)]
    pub gateway_url: Option<String>,
}

impl SelectionArgs {
    pub fn overrides(&self) -> ExportOverrides {
        ExportOverrides {
            function_name: self.function_name.clone(),
            metric_name: self.metric_name.clone(),
            template_variant: self.template_variant.clone(),
            threshold: self.threshold,
            max_samples: self.max_samples,
            val_fraction: self.val_fraction,
            seed: self.seed,
            max_wait_secs: None,
            cancel_on_timeout: false,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ExportCommand {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Directory that receives `<run_id>/train.jsonl`, `validation.jsonl` and `manifest.json`
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TuneCommand {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Also write the manifest under this directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Give up polling after this many seconds
    #[arg(long)]
    pub max_wait_secs: Option<u64>,

    /// Cancel the tuning job if it is still running when polling gives up
    #[arg(long)]
    pub cancel_on_timeout: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusCommand {
    /// Tuning job resource name
    pub job: String,

    /// Poll until the job reaches a terminal state
    #[arg(long)]
    pub wait: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CancelCommand {
    /// Tuning job resource name
    pub job: String,
}

#[derive(Args, Debug, Clone)]
pub struct SmokeCommand {
    /// Run a single target (openai, anthropic, gcp_vertex_gemini)
    #[arg(long)]
    pub target: Option<String>,

    /// Gateway URL (overrides TUNEUP_GATEWAY_URL)
    #[arg(long)]
    pub gateway_url: Option<String>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FragmentCommand {
    /// Serving endpoint of the tuned model (id or resource name)
    #[arg(long)]
    pub endpoint: String,

    /// Model and variant name in the fragment
    #[arg(long)]
    pub model_name: Option<String>,

    /// Variant whose templates the new variant inherits
    #[arg(long = "variant")]
    pub template_variant: Option<String>,

    /// Function the new variant belongs to
    #[arg(long = "function")]
    pub function_name: Option<String>,
}
