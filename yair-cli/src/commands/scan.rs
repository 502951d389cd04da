//! `yair <IMAGE>` scan handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use yair_core::config::YairConfig;
use yair_core::types::Severity;
use yair_image_scanner::{
    CleanupOutcome, CliOverrides, ImageReference, ImageScanError, ImageScanner, ScanOutcome,
    ScanSettings, Verdict,
};

use crate::cli::ScanArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute a scan.
///
/// A policy failure is rendered like a pass and then returned as
/// `CliError::PolicyFailed` (exit code 4).
pub async fn execute(
    args: ScanArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = YairConfig::load(config_path).await?;

    let image = args
        .image
        .ok_or_else(|| CliError::Command("no image given".to_owned()))?;
    let overrides = CliOverrides {
        registry: args.registry,
        no_namespace: args.no_namespace,
    };

    let reference = ImageReference::parse(&image, overrides.namespace_defaulting())?;
    let settings = ScanSettings::resolve(&config, &overrides, &reference)?;
    let scanner = ImageScanner::from_settings(&settings)?;

    info!(image = %reference, registry = %settings.registry.base_url(), "starting image scan");

    let outcome = match scanner.scan(&reference).await {
        Ok(outcome) => outcome,
        Err(err) => {
            if let ImageScanError::LayerSubmission { indexed, .. } = &err {
                report_partial_progress(&mut std::io::stderr().lock(), indexed)?;
            }
            return Err(err.into());
        }
    };

    let report = ScanReport(outcome);
    writer.render(&report)?;

    if let Verdict::Fail(reasons) = &report.0.verdict {
        let summary: Vec<String> = reasons.iter().map(ToString::to_string).collect();
        return Err(CliError::PolicyFailed(summary.join("; ")));
    }

    Ok(())
}

/// Print the layers Clair accepted before the chain broke.
fn report_partial_progress(w: &mut dyn Write, indexed: &[String]) -> std::io::Result<()> {
    warn!(indexed = indexed.len(), "layer chain submission aborted");
    writeln!(w, "layers indexed before failure: {}", indexed.len())?;
    for layer in indexed {
        writeln!(w, "  {layer}")?;
    }
    Ok(())
}

/// Scan result report; serialises as the underlying [`ScanOutcome`].
#[derive(Serialize)]
#[serde(transparent)]
pub struct ScanReport(pub ScanOutcome);

impl Render for ScanReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let outcome = &self.0;
        writeln!(w, "Image: {}", outcome.image.bold())?;
        writeln!(w, "Manifest: {} (schema v{})", outcome.manifest_url, outcome.schema_version)?;
        writeln!(w, "Layers: {}", outcome.layers.len())?;
        let cleanup = match &outcome.cleanup {
            CleanupOutcome::Deleted => "previous analysis deleted".to_owned(),
            CleanupOutcome::NothingToClean => "nothing to clean".to_owned(),
            CleanupOutcome::Failed { reason } => format!("failed ({reason})"),
        };
        writeln!(w, "Cleanup: {cleanup}")?;
        writeln!(w)?;

        let counts = &outcome.severity_counts;
        let summary = format!(
            "{} total (C:{} H:{} M:{} L:{} N:{} U:{})",
            counts.total(),
            counts.critical,
            counts.high,
            counts.medium,
            counts.low,
            counts.negligible,
            counts.unknown
        );
        if counts.total() > 0 {
            writeln!(w, "Vulnerabilities: {}", summary.red().bold())?;
        } else {
            writeln!(w, "Vulnerabilities: {}", summary.green().bold())?;
        }
        writeln!(w)?;

        if outcome.findings.is_empty() {
            writeln!(w, "{}", "No vulnerabilities found.".green())?;
        } else {
            writeln!(
                w,
                "{:<20} {:<10} {:>5} {:<25} {:<18} Fixed",
                "CVE", "Severity", "Score", "Package", "Version"
            )?;
            writeln!(w, "{}", "-".repeat(90))?;

            for f in &outcome.findings {
                let label = f.severity.to_string();
                let severity_colored = match f.severity {
                    Severity::Defcon1 | Severity::Critical => label.red().bold(),
                    Severity::High => label.red(),
                    Severity::Medium => label.yellow(),
                    Severity::Negligible | Severity::Unknown => label.dimmed(),
                    Severity::Low => label.normal(),
                };

                writeln!(
                    w,
                    "{:<20} {:<10} {:>5.1} {:<25} {:<18} {}",
                    f.id,
                    severity_colored,
                    f.score,
                    f.package,
                    f.version,
                    f.fixed_by.as_deref().unwrap_or("N/A")
                )?;
            }
        }

        writeln!(w)?;
        writeln!(
            w,
            "Image score: {:.1} (max allowed {:.1})",
            outcome.image_score, outcome.thresholds.max_score
        )?;
        match &outcome.verdict {
            Verdict::Pass => writeln!(w, "Verdict: {}", "PASS".green().bold())?,
            Verdict::Fail(reasons) => {
                writeln!(w, "Verdict: {}", "FAIL".red().bold())?;
                for reason in reasons {
                    writeln!(w, "  - {reason}")?;
                }
            }
        }

        Ok(())
    }
}
