//! Export and tuning pipeline.
//!
//! A run goes fetch → convert → split → write/publish → submit → poll →
//! fragment. Each stage is a separate function so the CLI can stop after any
//! of them (`export` ends after writing, `tune` runs the whole chain).

use crate::config::{ConfigError, ResolvedExport};
use crate::error::Result;
use crate::fragment::{render_fragment, FragmentSpec};
use chrono::Utc;
use tracing::{info, warn};
use tuneup_training::{
    compute_dataset_id, convert_all, poll_until_terminal, publish, split_by_episode, unique_object_name,
    validate_examples, write_jsonl_dataset, ConversionCounts, ConvertedExample, DatasetSplit, ExportLayout, ExportManifest,
    FineTuneClient, InferenceSource, JobOutcome, JobStatus, ObjectStore, PollOptions, ProgressEvent, ProgressSink,
    RunId, SplitArtifact, TrainingError, TuningJobSpec,
};

/// Converted and split examples, ready to be written or uploaded.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub run_id: RunId,
    pub split: DatasetSplit,
    pub counts: ConversionCounts,
}

/// Remote locations of an uploaded split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedDataset {
    pub train_uri: String,
    pub validation_uri: String,
}

/// Result of a full tuning run.
#[derive(Debug, Clone)]
pub struct TuneOutcome {
    pub manifest: ExportManifest,
    pub status: JobStatus,
    pub model_name: String,
    pub fragment: String,
}

/// Fetch, convert and split the inferences selected by `export`.
pub async fn prepare_dataset(source: &dyn InferenceSource, export: &ResolvedExport) -> Result<PreparedDataset> {
    let query = export.query();
    let records = source.fetch(&query).await?;
    info!(function = %export.function_name, fetched = records.len(), "Fetched inferences");

    let report = convert_all(&records);
    if report.dropped() > 0 {
        warn!(
            skipped = report.skipped,
            failed = report.failed,
            "Some inferences could not be converted and were dropped"
        );
    }
    let counts = ConversionCounts {
        fetched: records.len(),
        converted: report.examples.len(),
        skipped: report.skipped,
        failed: report.failed,
    };

    validate_examples(&report.examples)?;
    let split = split_by_episode(report.examples, export.settings.val_fraction, export.settings.seed)?;
    info!(
        train = split.train.len(),
        validation = split.validation.len(),
        train_episodes = split.train_episodes,
        validation_episodes = split.validation_episodes,
        requested = export.settings.val_fraction,
        realized = split.realized_validation_fraction(),
        "Split dataset by episode"
    );

    Ok(PreparedDataset { run_id: RunId::new(), split, counts })
}

fn split_artifact(
    examples: &[ConvertedExample],
    episodes: usize,
    uri: Option<String>,
) -> Result<SplitArtifact> {
    Ok(SplitArtifact { examples: examples.len(), episodes, dataset_id: compute_dataset_id(examples)?, uri })
}

/// Describe `prepared` as a manifest; `published` fills in the dataset URIs.
pub fn build_manifest(
    prepared: &PreparedDataset,
    export: &ResolvedExport,
    published: Option<&PublishedDataset>,
) -> Result<ExportManifest> {
    let split = &prepared.split;
    Ok(ExportManifest {
        run_id: prepared.run_id.clone(),
        created_at: Utc::now(),
        function_name: export.function_name.clone(),
        template_variant: export.variant_name.clone(),
        metric_name: export.metric_name.clone(),
        counts: prepared.counts.clone(),
        val_fraction: export.settings.val_fraction,
        realized_val_fraction: split.realized_validation_fraction(),
        seed: export.settings.seed,
        train: split_artifact(&split.train, split.train_episodes, published.map(|p| p.train_uri.clone()))?,
        validation: split_artifact(
            &split.validation,
            split.validation_episodes,
            published.map(|p| p.validation_uri.clone()),
        )?,
        job: None,
    })
}

/// Write both splits and the manifest under `layout`.
pub fn write_local(
    prepared: &PreparedDataset,
    export: &ResolvedExport,
    layout: &ExportLayout,
) -> Result<ExportManifest> {
    let run_id = &prepared.run_id;
    layout.ensure_run_dir(run_id)?;

    let train_path = layout.train_path(run_id);
    let validation_path = layout.validation_path(run_id);
    write_jsonl_dataset(&train_path, &prepared.split.train)?;
    write_jsonl_dataset(&validation_path, &prepared.split.validation)?;

    let local = PublishedDataset {
        train_uri: train_path.display().to_string(),
        validation_uri: validation_path.display().to_string(),
    };
    let manifest = build_manifest(prepared, export, Some(&local))?;
    manifest.write_to(&layout.manifest_path(run_id))?;

    info!(run_id = %run_id, dir = %layout.run_dir(run_id).display(), "Wrote export");
    Ok(manifest)
}

/// Upload both splits under fresh object names.
pub async fn publish_dataset(
    store: &dyn ObjectStore,
    prepared: &PreparedDataset,
    object_prefix: &str,
) -> Result<PublishedDataset> {
    let train_uri = publish(store, &prepared.split.train, &unique_object_name(object_prefix, "train")).await?;
    let validation_uri =
        publish(store, &prepared.split.validation, &unique_object_name(object_prefix, "validation")).await?;
    Ok(PublishedDataset { train_uri, validation_uri })
}

/// Tuning job spec for datasets published at `published`.
#[must_use]
pub fn job_spec(export: &ResolvedExport, published: &PublishedDataset, display_name: &str) -> TuningJobSpec {
    let mut spec = TuningJobSpec::new(&export.settings.base_model, &published.train_uri)
        .with_validation(&published.validation_uri)
        .with_display_name(display_name);
    spec.hyperparams = export.settings.hyperparams();
    spec
}

/// Submit `spec` and poll it to a terminal state.
///
/// With `cancel_on_timeout`, a job still running when polling gives up is
/// cancelled before the timeout is returned.
pub async fn launch_and_wait(
    client: &dyn FineTuneClient,
    spec: &TuningJobSpec,
    options: &PollOptions,
    cancel_on_timeout: bool,
    progress: &dyn ProgressSink,
) -> Result<JobStatus> {
    spec.validate()?;
    let job_id = client.submit(spec).await?;
    info!(provider = client.id(), job_id = %job_id, base_model = %spec.base_model, "Submitted tuning job");
    progress.on_event(ProgressEvent::Submitted { job_id: job_id.clone() });

    match poll_until_terminal(client, &job_id, options, progress).await {
        Err(err @ TrainingError::PollTimeout { .. }) if cancel_on_timeout => {
            match client.cancel(&job_id).await {
                Ok(()) => info!(job_id = %job_id, "Cancelled tuning job after poll timeout"),
                Err(e) => warn!(job_id = %job_id, error = %e, "Failed to cancel tuning job after poll timeout"),
            }
            Err(err.into())
        }
        polled => Ok(polled?),
    }
}

/// Name of the tuned model and variant in the generated fragment.
#[must_use]
pub fn tuned_model_name(export: &ResolvedExport, run_id: &RunId) -> String {
    export.settings.tuned_model_name.clone().unwrap_or_else(|| {
        let short: String = run_id.0.chars().take(8).collect();
        format!("{}-tuned-{short}", export.function_name)
    })
}

/// Render the config fragment for a tuned model served at `endpoint`.
pub fn fragment_for(export: &ResolvedExport, model_name: &str, endpoint: &str) -> Result<String> {
    let project_id = require_project_id(export)?;
    Ok(render_fragment(&FragmentSpec {
        model_name,
        endpoint,
        project_id,
        location: &export.settings.region,
        function_name: &export.function_name,
        variant_name: model_name,
        templates: &export.variant,
    })?)
}

fn require_project_id(export: &ResolvedExport) -> Result<&str> {
    Ok(export
        .settings
        .project_id
        .as_deref()
        .ok_or_else(|| ConfigError::InvalidValue("export.project_id is required for tuning".to_string()))?)
}

/// Run the whole chain: prepare, publish, tune, poll and render the fragment.
///
/// When `layout` is given the manifest (with the final job state) is also
/// written there.
pub async fn run_tuning(
    source: &dyn InferenceSource,
    store: &dyn ObjectStore,
    client: &dyn FineTuneClient,
    export: &ResolvedExport,
    layout: Option<&ExportLayout>,
    progress: &dyn ProgressSink,
) -> Result<TuneOutcome> {
    require_project_id(export)?;

    let prepared = prepare_dataset(source, export).await?;
    let published = publish_dataset(store, &prepared, &export.settings.object_prefix).await?;
    let mut manifest = build_manifest(&prepared, export, Some(&published))?;

    let model_name = tuned_model_name(export, &prepared.run_id);
    let spec = job_spec(export, &published, &model_name);
    let settings = &export.settings;
    let status = launch_and_wait(client, &spec, &settings.poll_options(), settings.cancel_on_timeout, progress).await?;

    manifest.job = Some(JobOutcome {
        job_id: status.job_id.clone(),
        state: status.state,
        tuned_model: status.tuned_model.clone(),
        endpoint: status.endpoint.clone(),
    });
    if let Some(layout) = layout {
        manifest.write_to(&layout.manifest_path(&prepared.run_id))?;
    }

    let endpoint = status.endpoint.as_deref().ok_or_else(|| TrainingError::Job {
        job: status.job_id.0.clone(),
        state: status.state,
        message: Some("succeeded without a serving endpoint".to_string()),
    })?;
    let fragment = fragment_for(export, &model_name, endpoint)?;

    Ok(TuneOutcome { manifest, status, model_name, fragment })
}
