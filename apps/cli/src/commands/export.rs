//! Export command implementation.

use super::types::ExportCommand;
use super::{inference_source, CommandContext};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use tuneup_core::pipeline::{prepare_dataset, write_local};
use tuneup_training::{ExportLayout, ExportManifest};

pub async fn execute(command: ExportCommand, ctx: &CommandContext) -> Result<()> {
    let export = ctx.resolve_export(command.selection.overrides())?;
    let source = inference_source(command.selection.input.as_ref(), command.selection.gateway_url.as_deref());

    let prepared = prepare_dataset(source.as_ref(), &export).await.context("Failed to prepare dataset")?;

    let output_dir = command
        .output_dir
        .or_else(|| ctx.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("exports"));
    let layout = ExportLayout::new(output_dir);
    let manifest = write_local(&prepared, &export, &layout).context("Failed to write export")?;

    if command.json || ctx.json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    print_summary(&manifest, &layout);
    Ok(())
}

fn print_summary(manifest: &ExportManifest, layout: &ExportLayout) {
    let counts = &manifest.counts;
    println!();
    println!("{}", "Export complete".bold().green());
    println!("  Run: {}", manifest.run_id.0.cyan());
    println!("  Function: {}", manifest.function_name);
    if let Some(metric) = &manifest.metric_name {
        println!("  Metric: {}", metric);
    }
    println!(
        "  Inferences: {} fetched, {} converted, {} skipped, {} failed",
        counts.fetched, counts.converted, counts.skipped, counts.failed
    );
    println!(
        "  Train: {} examples / {} episodes",
        manifest.train.examples, manifest.train.episodes
    );
    println!(
        "  Validation: {} examples / {} episodes ({:.1}% of examples, {:.1}% requested)",
        manifest.validation.examples,
        manifest.validation.episodes,
        manifest.realized_val_fraction * 100.0,
        manifest.val_fraction * 100.0
    );
    println!("  Output: {}", layout.run_dir(&manifest.run_id).display().to_string().dimmed());
    println!();
}
