//! CLI-specific error types and exit code mapping

use yair_core::error::{ConfigError, YairError};
use yair_image_scanner::ImageScanError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from yair-core.
    #[error("{0}")]
    Core(#[from] YairError),

    /// The scan pipeline stopped at some stage.
    #[error("{} failed: {}", .0.stage(), .0)]
    Scan(#[from] ImageScanError),

    /// The scan completed but the image violates the failure policy.
    #[error("policy failed: {0}")]
    PolicyFailed(String),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                              |
    /// |------|------------------------------------------------------|
    /// | 0    | Success (scan passed)                                |
    /// | 1    | General / command error                              |
    /// | 2    | Configuration error                                  |
    /// | 3    | Image reference invalid or not found in registry     |
    /// | 4    | Policy failed                                        |
    /// | 5    | Registry, manifest, layer submission or report error |
    /// | 10   | IO error                                             |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Core(YairError::Config(_)) => 2,
            Self::Scan(err) => match err {
                ImageScanError::Config { .. } | ImageScanError::ClientBuild(_) => 2,
                ImageScanError::ImageResolution { .. }
                | ImageScanError::RegistryNotFound { .. } => 3,
                _ => 5,
            },
            Self::PolicyFailed(_) => 4,
            Self::Io(_) | Self::Core(YairError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::Core(YairError::Config(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_exit_code() {
        let err = CliError::Config("test".to_owned());
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_core_config_error_exit_code() {
        let err: CliError = ConfigError::MissingField {
            field: "fail_on.score".to_owned(),
        }
        .into();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("fail_on.score"));
    }

    #[test]
    fn test_core_io_error_exit_code() {
        let err = CliError::Core(YairError::Io(std::io::Error::other("disk")));
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn test_scan_config_error_exit_code() {
        let err: CliError = ImageScanError::Config {
            field: "registry.host".to_owned(),
            reason: "no registry host".to_owned(),
        }
        .into();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().starts_with("configuration failed:"));
    }

    #[test]
    fn test_scan_error_message_names_stage_and_cause() {
        let err: CliError = ImageScanError::RegistryNotFound {
            url: "http://r:80/v2/library/app/manifests/1.0".to_owned(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "manifest fetch failed: image not found in registry: http://r:80/v2/library/app/manifests/1.0"
        );
    }

    #[test]
    fn test_image_resolution_exit_code() {
        let err: CliError = ImageScanError::ImageResolution {
            input: "Bad Image".to_owned(),
            reason: "whitespace".to_owned(),
        }
        .into();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().starts_with("image resolution failed:"));
    }

    #[test]
    fn test_registry_not_found_exit_code() {
        let err: CliError = ImageScanError::RegistryNotFound {
            url: "https://r/v2/library/app/manifests/latest".to_owned(),
        }
        .into();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().starts_with("manifest fetch failed:"));
    }

    #[test]
    fn test_transport_and_submission_exit_code() {
        let transport: CliError = ImageScanError::RegistryTransport {
            url: "https://r".to_owned(),
            status: Some(500),
            reason: "unexpected status".to_owned(),
        }
        .into();
        assert_eq!(transport.exit_code(), 5);

        let submission: CliError = ImageScanError::LayerSubmission {
            index: 1,
            layer: "sha256:b".to_owned(),
            indexed: vec!["sha256:a".to_owned()],
            reason: "boom".to_owned(),
        }
        .into();
        assert_eq!(submission.exit_code(), 5);
        assert!(submission.to_string().starts_with("layer submission failed:"));

        let schema: CliError = ImageScanError::UnsupportedManifestSchema {
            schema_version: 3,
            detail: "unknown".to_owned(),
        }
        .into();
        assert_eq!(schema.exit_code(), 5);
    }

    #[test]
    fn test_policy_failed_exit_code() {
        let err = CliError::PolicyFailed("image score 9.8 exceeds 7".to_owned());
        assert_eq!(err.exit_code(), 4);
        assert_eq!(err.to_string(), "policy failed: image score 9.8 exceeds 7");
    }

    #[test]
    fn test_io_error_exit_code() {
        let err = CliError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn test_command_and_json_exit_code() {
        assert_eq!(CliError::Command("x".to_owned()).exit_code(), 1);

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(CliError::from(json_err).exit_code(), 1);
    }
}
