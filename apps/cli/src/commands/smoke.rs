//! Smoke command implementation.

use super::types::SmokeCommand;
use super::{gateway_url, CommandContext};
use anyhow::{bail, Context, Result};
use colored::Colorize;
use tuneup_core::smoke::{run_smoke_tests, smoke_targets};
use tuneup_core::SmokeSettings;
use tuneup_models::GatewayClient;

pub async fn execute(command: SmokeCommand, ctx: &CommandContext) -> Result<()> {
    // The project config is optional here; without it the default targets are used.
    let settings = if ctx.project_config.exists() {
        ctx.load_project()?.smoke
    } else {
        SmokeSettings::default()
    };
    let targets = smoke_targets(&settings, command.target.as_deref()).context("Invalid smoke target")?;

    let client = GatewayClient::new(gateway_url(command.gateway_url.as_deref()));
    let summary = run_smoke_tests(&client, targets).await;

    if command.json || ctx.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!();
        println!("{}", "Batch Smoke Test".bold().cyan());
        for result in &summary.results {
            match (&result.batch_id, &result.error) {
                (Some(batch_id), _) => {
                    println!("  {} {} batch {}", "✓".green(), result.target.name, batch_id.dimmed());
                }
                (None, error) => {
                    println!(
                        "  {} {} {}",
                        "✗".red(),
                        result.target.name,
                        error.as_deref().unwrap_or("unknown error").red()
                    );
                }
            }
        }
        println!();
    }

    if !summary.all_succeeded() {
        bail!("{} smoke target(s) failed", summary.results.iter().filter(|r| !r.succeeded()).count());
    }
    Ok(())
}
