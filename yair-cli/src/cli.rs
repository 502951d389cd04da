//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand, ValueEnum};

use yair_core::config::{DEFAULT_CONFIG_PATH, LOG_LEVELS};

/// yair -- scan a container image with Clair and fail on vulnerable images.
///
/// `yair <IMAGE>` runs a scan; `yair config <ACTION>` inspects the configuration.
#[derive(Parser, Debug)]
#[command(
    name = "yair",
    version,
    about,
    long_about = None,
    subcommand_negates_reqs = true
)]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true, value_parser = PossibleValuesParser::new(LOG_LEVELS))]
    pub log_level: Option<String>,

    /// Output format (default: output.format from the config file).
    #[arg(short, long, global = true)]
    pub output: Option<OutputFormat>,

    #[command(flatten)]
    pub scan: ScanArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table output.
    Table,
    /// Machine-readable JSON.
    Json,
    /// No report; the exit code carries the verdict.
    Quiet,
}

impl OutputFormat {
    /// Maps a validated `output.format` config value.
    pub fn from_config(value: &str) -> Option<Self> {
        match value {
            "table" => Some(Self::Table),
            "json" => Some(Self::Json),
            "quiet" => Some(Self::Quiet),
            _ => None,
        }
    }
}

// ---- scan ----

/// Scan an image (the default action).
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Do not prepend `library/` to single-segment image names.
    #[arg(long)]
    pub no_namespace: bool,

    /// Registry host (or host:port), overriding registry.host.
    #[arg(short, long)]
    pub registry: Option<String>,

    /// Image to scan, e.g. `nginx`, `myorg/app:1.2` or `host:5000/team/app:1.0`.
    #[arg(required = true)]
    pub image: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- config ----

/// Manage yair configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, registry, clair, fail_on, output).
        #[arg(long)]
        section: Option<String>,
    },
}
