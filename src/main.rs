//! Kiln - compiler bridge cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use kiln::cli::{Cli, Commands};
use kiln::config::ConfigManager;
use kiln::error::KilnResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> KilnResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("kiln=warn"),
        1 => EnvFilter::new("kiln=info"),
        _ => EnvFilter::new("kiln=debug"),
    };

    // Logs go to stderr, stdout carries command output
    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .init();
    }

    match cli.command {
        Commands::Provide(args) => kiln::cli::commands::provide(args, &config).await,
        Commands::Key(args) => kiln::cli::commands::key(args, &config).await,
        Commands::Cache(args) => kiln::cli::commands::cache(args, &config).await,
        Commands::Config(args) => {
            kiln::cli::commands::config(args, &config_manager, &config).await
        }
    }
}
