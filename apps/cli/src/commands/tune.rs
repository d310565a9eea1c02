//! Tune command implementation.

use super::types::TuneCommand;
use super::{access_token, gcs_store, inference_source, progress_sink, vertex_client, CommandContext};
use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use tuneup_core::pipeline::run_tuning;
use tuneup_training::ExportLayout;

pub async fn execute(command: TuneCommand, ctx: &CommandContext) -> Result<()> {
    let mut overrides = command.selection.overrides();
    overrides.max_wait_secs = command.max_wait_secs;
    overrides.cancel_on_timeout = command.cancel_on_timeout;
    let export = ctx.resolve_export(overrides)?;

    let token = access_token()?;
    let store = gcs_store(&export.settings, token.clone())?;
    let client = vertex_client(&export.settings, token)?;
    let source = inference_source(command.selection.input.as_ref(), command.selection.gateway_url.as_deref());

    let layout = command.output_dir.or_else(|| ctx.output_dir.clone()).map(ExportLayout::new);
    if let Some(layout) = &layout {
        std::fs::create_dir_all(layout.root())
            .with_context(|| format!("Failed to create {}", layout.root().display()))?;
    }

    let json_output = command.json || ctx.json;
    if !json_output {
        println!();
        println!(
            "{}",
            format!("Tuning {} on {} from {}", export.function_name, export.settings.base_model, export.variant_name)
                .bold()
                .cyan()
        );
    }

    let progress = progress_sink(json_output);
    let outcome = run_tuning(source.as_ref(), &store, &client, &export, layout.as_ref(), progress.as_ref())
        .await
        .context("Tuning run failed")?;

    if json_output {
        let out = json!({
            "manifest": outcome.manifest,
            "status": outcome.status,
            "model_name": outcome.model_name,
            "fragment": outcome.fragment,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", "Tuning complete".bold().green());
    println!("  Job: {}", outcome.status.job_id.0.cyan());
    if let Some(model) = &outcome.status.tuned_model {
        println!("  Tuned model: {}", model);
    }
    if let Some(uri) = &outcome.manifest.train.uri {
        println!("  Train data: {}", uri.dimmed());
    }
    if let Some(uri) = &outcome.manifest.validation.uri {
        println!("  Validation data: {}", uri.dimmed());
    }
    println!();
    println!("{}", "Add this to your gateway config:".bold());
    println!();
    println!("{}", outcome.fragment);
    Ok(())
}
