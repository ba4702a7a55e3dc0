mod cli;
mod commands;
mod completions;
mod config;
mod error;
mod output;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use ragsheet_client::RagClient;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error::handle_error(err);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = &cli.command {
        completions::generate_completions(*shell);
        return Ok(());
    }

    // Log to a file so log lines never interleave with streamed answers
    let _guard = init_logging(cli.verbose)?;

    let config = config::CliConfig::load();
    let client = RagClient::new(config.client_config(cli.base_url.as_deref()))?;

    match cli.command {
        Commands::Chat(args) => commands::chat::run(&client, &config, args).await,
        Commands::Ask(args) => commands::ask::run(&client, args, cli.format).await,
        Commands::Files { command } => commands::files::run(&client, command, cli.format).await,
        Commands::Health(args) => commands::health::run(&client, &config, args, cli.format).await,
        Commands::Completions { .. } => Ok(()),
    }
}

fn init_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = dirs::data_local_dir()
        .context("could not determine the local data directory")?
        .join("ragsheet")
        .join("logs");
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir, "ragsheet.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_env("RAGSHEET_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    Ok(guard)
}
