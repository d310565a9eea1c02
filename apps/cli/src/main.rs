//! Tuneup CLI - fine-tune Gemini models from curated gateway inferences
//!
//! This CLI provides a `tuneup` command that exports good inferences as a
//! Gemini tuning dataset, runs a Vertex AI tuning job, and smoke-tests batch
//! inference across providers.

mod commands;
mod config;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::types::{CancelCommand, ExportCommand, FragmentCommand, SmokeCommand, StatusCommand, TuneCommand};
use commands::{cancel, export, fragment, smoke, status, tune, CommandContext};

/// Tuneup CLI - supervised fine-tuning from inference feedback
#[derive(Parser, Debug)]
#[command(
    name = "tuneup",
    author,
    version,
    about = "Tuneup - fine-tune Gemini on your best inferences",
    long_about = "Tuneup selects inferences by metric feedback, converts them to the Gemini tuning format,\nsplits them by episode, uploads them and runs a Vertex AI supervised tuning job."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Project configuration file (defaults to ./tuneup.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export a train/validation dataset to a local directory
    ///
    /// Fetches inferences that pass the configured metric, converts them to
    /// the Gemini tuning format and splits them by episode.
    Export(ExportCommand),

    /// Export, upload and run a tuning job to completion
    ///
    /// Prints a gateway config fragment for the tuned model once the job
    /// succeeds.
    Tune(TuneCommand),

    /// Show the state of a tuning job
    Status(StatusCommand),

    /// Request cancellation of a tuning job
    Cancel(CancelCommand),

    /// Submit a batch inference to each smoke-test provider
    Smoke(SmokeCommand),

    /// Render the config fragment for an already tuned model
    Fragment(FragmentCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let cli_config = config::load_config();

    // Apply config to environment (only if not already set)
    // SAFETY: environment variables are set before any command spawns tasks;
    // the runtime's worker threads do not read the environment.
    unsafe {
        config::apply_config_to_env(&cli_config);
    }

    // Initialize tracing
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // If no command provided, show help
    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    let ctx = CommandContext::new(args.config, &cli_config);

    // Execute command
    match command {
        Command::Export(cmd) => export::execute(cmd, &ctx).await?,
        Command::Tune(cmd) => tune::execute(cmd, &ctx).await?,
        Command::Status(cmd) => status::execute(cmd, &ctx).await?,
        Command::Cancel(cmd) => cancel::execute(cmd, &ctx).await?,
        Command::Smoke(cmd) => smoke::execute(cmd, &ctx).await?,
        Command::Fragment(cmd) => fragment::execute(cmd, &ctx)?,
    }

    Ok(())
}
