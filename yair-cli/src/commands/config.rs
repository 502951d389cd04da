//! `yair config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use yair_core::config::YairConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Section names accepted by `config show --section`.
pub const SECTIONS: [&str; 5] = ["general", "registry", "clair", "fail_on", "output"];

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Execute the config validate subcommand.
///
/// # Errors
///
/// Returns `CliError::Config` if validation fails (missing fields, invalid values, parse errors).
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let report = validation_report(config_path).await;
    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Load the configuration and collect the outcome as a report.
pub async fn validation_report(config_path: &Path) -> ConfigValidationReport {
    let errors = match YairConfig::load(config_path).await {
        Ok(_) => Vec::new(),
        Err(e) => vec![e.to_string()],
    };
    ConfigValidationReport {
        source: config_path.display().to_string(),
        valid: errors.is_empty(),
        errors,
    }
}

/// Execute the config show subcommand.
///
/// Displays the effective configuration (file + env overrides + defaults)
/// with the registry token redacted.
///
/// # Errors
///
/// Returns `CliError::Core` if loading fails or `CliError::Command` if the section name is invalid.
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = YairConfig::load(config_path).await?.redacted();
    let report = show_report(&config, config_path, section)?;
    writer.render(&report)?;

    Ok(())
}

/// Build the `config show` report for a loaded configuration.
pub fn show_report(
    config: &YairConfig,
    config_path: &Path,
    section: Option<String>,
) -> Result<ConfigReport, CliError> {
    let (config_yaml, structured) = match section.as_deref() {
        None => encode(config)?,
        Some("general") => encode(&config.general)?,
        Some("registry") => encode(&config.registry)?,
        Some("clair") => encode(&config.clair)?,
        Some("fail_on") => encode(&config.fail_on)?,
        Some("output") => encode(&config.output)?,
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {other} (expected: {})",
                SECTIONS.join(", ")
            )));
        }
    };

    Ok(ConfigReport {
        source: config_path.display().to_string(),
        section,
        config: structured,
        config_yaml,
    })
}

fn encode<T: Serialize>(value: &T) -> Result<(String, serde_json::Value), CliError> {
    let yaml = serde_yaml::to_string(value)
        .map_err(|e| CliError::Command(format!("failed to encode configuration: {e}")))?;
    Ok((yaml, serde_json::to_value(value)?))
}

/// Configuration display report.
///
/// `config_yaml` is only used for table rendering; JSON output carries `config`.
#[derive(Serialize)]
pub struct ConfigReport {
    /// Configuration file path
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Structured configuration (with the token redacted)
    pub config: serde_json::Value,
    /// Serialized YAML configuration
    #[serde(skip)]
    pub config_yaml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{section}]");
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_yaml)?;

        Ok(())
    }
}

/// Outcome of `config validate`.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Empty when `valid`
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.valid {
            writeln!(w, "{} {}", "VALID".green().bold(), self.source)?;
            return Ok(());
        }

        writeln!(
            w,
            "{} {} ({} problem(s))",
            "INVALID".red().bold(),
            self.source,
            self.errors.len()
        )?;
        for err in &self.errors {
            writeln!(w, "  - {}", err.red())?;
        }

        Ok(())
    }
}
