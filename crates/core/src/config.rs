//! 설정 관리 — config.yaml 파싱 및 런타임 설정
//!
//! [`YairConfig`]는 레지스트리, Clair, 정책, 출력 설정을 담는 최상위 구조체입니다.
//! 시작 시 한 번 로드·검증되고 이후에는 변경되지 않습니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선, 스캐너의 설정 리졸버에서 병합)
//! 2. 환경변수 (`YAIR_REGISTRY_HOST=registry.local` 형식)
//! 3. 설정 파일 (`config.yaml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), yair_core::error::YairError> {
//! use yair_core::config::YairConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드 + 검증
//! let config = YairConfig::load("/opt/yair/config/config.yaml").await?;
//!
//! // YAML 문자열에서 직접 파싱 (검증 없음)
//! let config = YairConfig::parse("clair:\n  host: clair.local\n")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, YairError};

/// 기본 설정 파일 경로
pub const DEFAULT_CONFIG_PATH: &str = "/opt/yair/config/config.yaml";

/// 허용되는 출력 형식
pub const OUTPUT_FORMATS: [&str; 3] = ["table", "json", "quiet"];

/// 허용되는 로그 레벨
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["json", "pretty"];
const MAX_TIMEOUT_SECS: u64 = 600;
const MAX_SCORE: f64 = 10.0;
const REDACTED: &str = "***REDACTED***";

/// ssl 여부에 따른 기본 포트 (443 / 80)
pub fn default_port(ssl: bool) -> u16 {
    if ssl { 443 } else { 80 }
}

/// yair 통합 설정
///
/// `config.yaml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct YairConfig {
    /// 일반 설정 (로깅)
    pub general: GeneralConfig,
    /// 도커 레지스트리 설정
    pub registry: RegistryConfig,
    /// Clair 서버 설정
    pub clair: ClairConfig,
    /// 실패 정책 설정
    pub fail_on: FailOnConfig,
    /// 출력 설정
    pub output: OutputConfig,
}

impl YairConfig {
    /// YAML 파일에서 설정을 로드하고 환경변수 오버라이드 후 검증합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, YairError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// YAML 파일에서 설정을 읽습니다 (오버라이드·검증 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, YairError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                YairError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                YairError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// YAML 문자열에서 설정을 파싱합니다.
    ///
    /// 빈 문서(또는 주석만 있는 문서)는 기본값으로 취급합니다.
    pub fn parse(yaml: &str) -> Result<Self, YairError> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).map_err(parse_failed)?;
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(value).map_err(parse_failed)
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `YAIR_{SECTION}_{FIELD}`
    /// 예: `YAIR_CLAIR_HOST=clair.internal`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "YAIR_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "YAIR_GENERAL_LOG_FORMAT");

        // Registry
        override_string(&mut self.registry.host, "YAIR_REGISTRY_HOST");
        override_bool(&mut self.registry.ssl, "YAIR_REGISTRY_SSL");
        override_bool(&mut self.registry.ssl_verify, "YAIR_REGISTRY_SSL_VERIFY");
        override_opt_u16(&mut self.registry.port, "YAIR_REGISTRY_PORT");
        override_opt_string(&mut self.registry.token, "YAIR_REGISTRY_TOKEN");
        override_u64(
            &mut self.registry.timeout_secs,
            "YAIR_REGISTRY_TIMEOUT_SECS",
        );

        // Clair
        override_string(&mut self.clair.host, "YAIR_CLAIR_HOST");
        override_bool(&mut self.clair.ssl, "YAIR_CLAIR_SSL");
        override_bool(&mut self.clair.ssl_verify, "YAIR_CLAIR_SSL_VERIFY");
        override_opt_u16(&mut self.clair.port, "YAIR_CLAIR_PORT");
        override_u64(&mut self.clair.timeout_secs, "YAIR_CLAIR_TIMEOUT_SECS");

        // Policy
        override_opt_f64(&mut self.fail_on.score, "YAIR_FAIL_ON_SCORE");
        override_bool(
            &mut self.fail_on.big_vulnerability,
            "YAIR_FAIL_ON_BIG_VULNERABILITY",
        );

        // Output
        override_string(&mut self.output.format, "YAIR_OUTPUT_FORMAT");
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// `registry.host`는 CLI `--registry` 또는 이미지 참조로도 지정할 수 있으므로
    /// 여기서는 형식만 검사하고, 최종 존재 여부는 스캐너 설정 리졸버가 확인합니다.
    pub fn validate(&self) -> Result<(), YairError> {
        if !LOG_LEVELS.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", LOG_LEVELS.join(", ")),
            ));
        }

        if !LOG_FORMATS.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", LOG_FORMATS.join(", ")),
            ));
        }

        validate_host("registry.host", &self.registry.host)?;
        validate_port("registry.port", self.registry.port)?;
        validate_timeout("registry.timeout_secs", self.registry.timeout_secs)?;

        if self.clair.host.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "clair.host".to_owned(),
            }
            .into());
        }
        validate_host("clair.host", &self.clair.host)?;
        validate_port("clair.port", self.clair.port)?;
        validate_timeout("clair.timeout_secs", self.clair.timeout_secs)?;

        match self.fail_on.score {
            None => {
                return Err(ConfigError::MissingField {
                    field: "fail_on.score".to_owned(),
                }
                .into());
            }
            Some(score) if !score.is_finite() || !(0.0..=MAX_SCORE).contains(&score) => {
                return Err(invalid(
                    "fail_on.score",
                    format!("must be between 0 and {MAX_SCORE}"),
                ));
            }
            Some(_) => {}
        }

        if !OUTPUT_FORMATS.contains(&self.output.format.as_str()) {
            return Err(invalid(
                "output.format",
                format!("must be one of: {}", OUTPUT_FORMATS.join(", ")),
            ));
        }

        Ok(())
    }

    /// 민감 정보(레지스트리 토큰)를 가린 사본을 반환합니다.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.registry.token.is_some() {
            copy.registry.token = Some(REDACTED.to_owned());
        }
        copy
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 도커 레지스트리 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// 레지스트리 호스트명 (스킴 없이)
    pub host: String,
    /// HTTPS 사용 여부
    pub ssl: bool,
    /// TLS 인증서 검증 여부
    pub ssl_verify: bool,
    /// 포트 (없으면 ssl 여부에 따라 443/80)
    pub port: Option<u16>,
    /// Bearer 토큰 (레이어 blob 접근용)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            ssl: true,
            ssl_verify: true,
            port: None,
            token: None,
            timeout_secs: 30,
        }
    }
}

/// Clair 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClairConfig {
    /// Clair 호스트명 (필수)
    pub host: String,
    /// HTTPS 사용 여부
    pub ssl: bool,
    /// TLS 인증서 검증 여부
    pub ssl_verify: bool,
    /// 포트 (없으면 ssl 여부에 따라 443/80)
    pub port: Option<u16>,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for ClairConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            ssl: true,
            ssl_verify: true,
            port: None,
            timeout_secs: 30,
        }
    }
}

/// 실패 정책 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FailOnConfig {
    /// 허용 최대 이미지 점수 (0-10, 필수). 이 값을 초과하면 실패
    pub score: Option<f64>,
    /// 치명적 등급 취약점이 하나라도 있으면 실패
    pub big_vulnerability: bool,
}

/// 출력 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// 출력 형식 (table, json, quiet)
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "table".to_owned(),
        }
    }
}

// --- 검증 헬퍼 ---

fn parse_failed(e: serde_yaml::Error) -> YairError {
    YairError::Config(ConfigError::ParseFailed {
        reason: e.to_string(),
    })
}

fn invalid(field: &str, reason: String) -> YairError {
    YairError::Config(ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    })
}

fn validate_host(field: &str, host: &str) -> Result<(), YairError> {
    if host.contains("://") {
        return Err(invalid(
            field,
            "must be a bare host name; use the ssl option to select the scheme".to_owned(),
        ));
    }
    if host.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(invalid(
            field,
            "must not contain whitespace or '/'".to_owned(),
        ));
    }
    Ok(())
}

fn validate_port(field: &str, port: Option<u16>) -> Result<(), YairError> {
    if port == Some(0) {
        return Err(invalid(field, "must be 1-65535".to_owned()));
    }
    Ok(())
}

fn validate_timeout(field: &str, secs: u64) -> Result<(), YairError> {
    if secs == 0 || secs > MAX_TIMEOUT_SECS {
        return Err(invalid(field, format!("must be 1-{MAX_TIMEOUT_SECS}")));
    }
    Ok(())
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_opt_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = if val.is_empty() { None } else { Some(val) };
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_opt_u16(target: &mut Option<u16>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = Some(parsed),
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_opt_f64(target: &mut Option<f64>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<f64>() {
            Ok(parsed) => *target = Some(parsed),
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse f64 from env var, ignoring"
            ),
        }
    }
}
