//! Cancel command implementation.

use super::types::CancelCommand;
use super::{access_token, vertex_client, CommandContext};
use anyhow::{Context, Result};
use colored::Colorize;
use tuneup_training::{FineTuneClient, TuningJobId};

pub async fn execute(command: CancelCommand, ctx: &CommandContext) -> Result<()> {
    let project = ctx.load_project()?;
    let client = vertex_client(&project.export, access_token()?)?;
    let job_id = TuningJobId(command.job);

    client.cancel(&job_id).await.with_context(|| format!("Failed to cancel {job_id}"))?;

    println!("{} {}", "Cancellation requested for".yellow(), job_id.0);
    Ok(())
}
