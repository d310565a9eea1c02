//! Status command implementation.

use super::types::StatusCommand;
use super::{access_token, progress_sink, vertex_client, CommandContext};
use anyhow::{Context, Result};
use colored::Colorize;
use tuneup_training::{poll_until_terminal, FineTuneClient, JobState, JobStatus, TuningJobId};

pub async fn execute(command: StatusCommand, ctx: &CommandContext) -> Result<()> {
    let project = ctx.load_project()?;
    let client = vertex_client(&project.export, access_token()?)?;
    let job_id = TuningJobId(command.job);
    let json_output = command.json || ctx.json;

    let status = if command.wait {
        let progress = progress_sink(json_output);
        poll_until_terminal(&client, &job_id, &project.export.poll_options(), progress.as_ref())
            .await
            .with_context(|| format!("Tuning job {job_id} did not succeed"))?
    } else {
        client.status(&job_id).await.with_context(|| format!("Failed to fetch status of {job_id}"))?
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    print_status(&status);
    Ok(())
}

fn print_status(status: &JobStatus) {
    let state = match status.state {
        JobState::Succeeded => status.state.to_string().green(),
        JobState::Failed | JobState::Cancelled => status.state.to_string().red(),
        JobState::Pending | JobState::Running => status.state.to_string().yellow(),
    };

    println!();
    println!("{}", "Tuning Job".bold().cyan());
    println!("  Job: {}", status.job_id.0);
    println!("  State: {}", state);
    if let Some(model) = &status.tuned_model {
        println!("  Tuned model: {}", model);
    }
    if let Some(endpoint) = &status.endpoint {
        println!("  Endpoint: {}", endpoint);
    }
    if let Some(error) = &status.error {
        println!("  Error: {}", error.red());
    }
    println!();
}
