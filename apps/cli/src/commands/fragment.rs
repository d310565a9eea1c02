//! Fragment command implementation.

use super::types::FragmentCommand;
use super::CommandContext;
use anyhow::{Context, Result};
use tuneup_core::ExportOverrides;
use tuneup_core::pipeline::{fragment_for, tuned_model_name};
use tuneup_training::RunId;

pub fn execute(command: FragmentCommand, ctx: &CommandContext) -> Result<()> {
    let export = ctx.resolve_export(ExportOverrides {
        function_name: command.function_name,
        template_variant: command.template_variant,
        ..Default::default()
    })?;

    let model_name = command.model_name.unwrap_or_else(|| tuned_model_name(&export, &RunId::new()));
    let fragment =
        fragment_for(&export, &model_name, &command.endpoint).context("Failed to render config fragment")?;

    print!("{fragment}");
    Ok(())
}
