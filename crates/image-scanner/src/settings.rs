//! 설정 리졸버
//!
//! 검증된 [`YairConfig`], CLI 오버라이드, 이미지 참조를 병합하여
//! 한 번의 스캔 실행에 사용할 불변 설정([`ScanSettings`])을 만듭니다.
//!
//! # 레지스트리 호스트 우선순위
//!
//! 1. CLI `--registry` (host 또는 host:port)
//! 2. 이미지 참조에 포함된 호스트 (`registry.local/app`)
//! 3. 설정 파일 `registry.host`
//!
//! 선택된 출처에 포트가 없으면 `registry.port`, 그것도 없으면 ssl 여부에 따른
//! 기본 포트(443/80)를 사용합니다.

use std::time::Duration;

use serde::Serialize;

use yair_core::config::{YairConfig, default_port};

use crate::error::ImageScanError;
use crate::policy::PolicyThresholds;
use crate::reference::ImageReference;

/// CLI에서 전달된 오버라이드
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `--registry` 값 (host 또는 host:port)
    pub registry: Option<String>,
    /// `--no-namespace` 지정 여부
    pub no_namespace: bool,
}

impl CliOverrides {
    /// 단일 세그먼트 이름에 `library/`를 붙일지 여부
    pub fn namespace_defaulting(&self) -> bool {
        !self.no_namespace
    }
}

/// 레지스트리 접속 설정 (불변)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrySettings {
    /// 호스트명
    pub host: String,
    /// HTTPS 사용 여부
    pub ssl_enabled: bool,
    /// TLS 인증서 검증 여부
    pub ssl_verify: bool,
    /// 포트
    pub port: u16,
    /// 요청 타임아웃
    #[serde(skip)]
    pub timeout: Duration,
    /// Bearer 토큰
    #[serde(skip)]
    pub token: Option<String>,
}

impl RegistrySettings {
    /// `{protocol}://{host}:{port}`
    pub fn base_url(&self) -> String {
        base_url(self.ssl_enabled, &self.host, self.port)
    }

    /// 매니페스트 URL: `{base}/v2/{name}/manifests/{tag}`
    pub fn manifest_url(&self, reference: &ImageReference) -> String {
        format!(
            "{}/v2/{}/manifests/{}",
            self.base_url(),
            reference.name(),
            reference.tag()
        )
    }
}

/// Clair 접속 설정 (불변)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClairSettings {
    /// 호스트명
    pub host: String,
    /// HTTPS 사용 여부
    pub ssl_enabled: bool,
    /// TLS 인증서 검증 여부
    pub ssl_verify: bool,
    /// 포트
    pub port: u16,
    /// 요청 타임아웃
    #[serde(skip)]
    pub timeout: Duration,
}

impl ClairSettings {
    /// `{protocol}://{host}:{port}`
    pub fn base_url(&self) -> String {
        base_url(self.ssl_enabled, &self.host, self.port)
    }
}

/// 한 번의 스캔에 필요한 모든 설정
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    /// 레지스트리 설정
    pub registry: RegistrySettings,
    /// Clair 설정
    pub clair: ClairSettings,
    /// 정책 임계값
    pub thresholds: PolicyThresholds,
}

impl ScanSettings {
    /// 설정 파일, CLI 오버라이드, 이미지 참조를 병합합니다.
    ///
    /// # Errors
    ///
    /// 어떤 출처에서도 레지스트리 호스트를 얻지 못했거나, `--registry` 값이
    /// 잘못되었거나, Clair 호스트 또는 `fail_on.score`가 없으면
    /// [`ImageScanError::Config`]를 반환합니다.
    pub fn resolve(
        config: &YairConfig,
        cli: &CliOverrides,
        reference: &ImageReference,
    ) -> Result<Self, ImageScanError> {
        let (host, explicit_port) = match (&cli.registry, reference.registry_host()) {
            (Some(raw), _) => split_host_port("--registry", raw)?,
            (None, Some(host)) => (host.to_owned(), reference.registry_port()),
            (None, None) => (config.registry.host.trim().to_owned(), None),
        };
        if host.is_empty() {
            return Err(config_error(
                "registry.host",
                "no registry host given (set registry.host, pass --registry, or use a host-qualified image)",
            ));
        }

        let ssl = config.registry.ssl;
        let registry = RegistrySettings {
            host,
            ssl_enabled: ssl,
            ssl_verify: config.registry.ssl_verify,
            port: explicit_port
                .or(config.registry.port)
                .unwrap_or_else(|| default_port(ssl)),
            timeout: Duration::from_secs(config.registry.timeout_secs),
            token: config.registry.token.clone().filter(|t| !t.is_empty()),
        };

        let clair_host = config.clair.host.trim();
        if clair_host.is_empty() {
            return Err(config_error("clair.host", "is required"));
        }
        let clair = ClairSettings {
            host: clair_host.to_owned(),
            ssl_enabled: config.clair.ssl,
            ssl_verify: config.clair.ssl_verify,
            port: config
                .clair
                .port
                .unwrap_or_else(|| default_port(config.clair.ssl)),
            timeout: Duration::from_secs(config.clair.timeout_secs),
        };

        let max_score = config
            .fail_on
            .score
            .ok_or_else(|| config_error("fail_on.score", "is required"))?;
        let thresholds = PolicyThresholds {
            max_score,
            fail_on_big_vulnerability: config.fail_on.big_vulnerability,
        };

        tracing::debug!(
            registry = %registry.base_url(),
            clair = %clair.base_url(),
            max_score,
            "scan settings resolved"
        );

        Ok(Self {
            registry,
            clair,
            thresholds,
        })
    }
}

fn base_url(ssl: bool, host: &str, port: u16) -> String {
    let protocol = if ssl { "https" } else { "http" };
    format!("{protocol}://{host}:{port}")
}

fn config_error(field: &str, reason: &str) -> ImageScanError {
    ImageScanError::Config {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
}

/// `host` 또는 `host:port`를 분리합니다.
fn split_host_port(field: &str, raw: &str) -> Result<(String, Option<u16>), ImageScanError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(config_error(field, "must not be empty"));
    }
    if raw.contains("://") || raw.contains('/') || raw.chars().any(char::is_whitespace) {
        return Err(config_error(
            field,
            "must be a bare host or host:port without scheme or path",
        ));
    }
    match raw.split_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| config_error(field, "port must be a number between 1 and 65535"))?;
            if host.is_empty() {
                return Err(config_error(field, "host must not be empty"));
            }
            Ok((host.to_owned(), Some(port)))
        }
        None => Ok((raw.to_owned(), None)),
    }
}
