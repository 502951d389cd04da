//! `yair` -- submit a container image's layers to Clair and judge the result.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::path::Path;

use clap::Parser;
use colored::Colorize;

use yair_core::YairConfig;

use crate::cli::{Cli, Commands, OutputFormat};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("{} {err}", "error:".red().bold());
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let preliminary = preliminary_config(&cli.config).await;

    let mut general = preliminary
        .as_ref()
        .map(|c| c.general.clone())
        .unwrap_or_default();
    if let Some(level) = cli.log_level.clone() {
        general.log_level = level;
    }
    logging::init_tracing(&general)?;
    yair_core::metrics::describe_all();

    let format = cli
        .output
        .or_else(|| {
            preliminary
                .as_ref()
                .and_then(|c| OutputFormat::from_config(&c.output.format))
        })
        .unwrap_or(OutputFormat::Table);
    let writer = OutputWriter::new(format);

    tracing::debug!(config = %cli.config.display(), ?format, "yair starting");

    match cli.command {
        Some(Commands::Config(args)) => commands::config::execute(args, &cli.config, &writer).await,
        None => commands::scan::execute(cli.scan, &cli.config, &writer).await,
    }
}

/// Read the file and env overrides without validation, only to set up
/// logging and the output format before the command loads it properly.
async fn preliminary_config(path: &Path) -> Option<YairConfig> {
    let mut config = YairConfig::from_file(path).await.ok()?;
    config.apply_env_overrides();
    Some(config)
}
