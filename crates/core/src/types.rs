//! 도메인 타입 — 취약점 심각도 및 취약점 정보
//!
//! Clair가 보고하는 심각도 체계를 그대로 따르며,
//! 정책 평가기가 사용하는 점수 환산 규칙을 함께 정의합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 심각도 레벨
///
/// Clair의 심각도 등급입니다.
/// `Ord` 구현으로 비교가 가능합니다 (`Unknown < Negligible < ... < Defcon1`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    /// 심각도 정보 없음
    #[default]
    Unknown,
    /// 무시 가능
    Negligible,
    /// 낮음
    Low,
    /// 중간
    Medium,
    /// 높음
    High,
    /// 치명적
    Critical,
    /// 최고 등급 — 즉시 대응 필요
    Defcon1,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않으며, 알 수 없는 값은 `Unknown`으로 취급합니다.
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "negligible" => Self::Negligible,
            "low" => Self::Low,
            "medium" | "moderate" => Self::Medium,
            "high" | "important" => Self::High,
            "critical" => Self::Critical,
            "defcon1" => Self::Defcon1,
            _ => Self::Unknown,
        }
    }

    /// CVSS 점수가 없을 때 사용하는 심각도 기반 기본 점수 (0-10)
    pub fn default_score(self) -> f64 {
        match self {
            Self::Unknown => 0.0,
            Self::Negligible => 1.0,
            Self::Low => 3.0,
            Self::Medium => 5.0,
            Self::High => 7.0,
            Self::Critical => 9.0,
            Self::Defcon1 => 10.0,
        }
    }

    /// "큰" 취약점(치명적 등급) 여부
    pub fn is_critical_tier(self) -> bool {
        matches!(self, Self::Critical | Self::Defcon1)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "Unknown",
            Self::Negligible => "Negligible",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
            Self::Defcon1 => "Defcon1",
        };
        f.write_str(name)
    }
}

/// 이미지에서 발견된 취약점 한 건
///
/// Clair 레이어 보고서의 feature × vulnerability 쌍 하나에 해당합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    /// 취약점 ID (예: CVE-2024-1234)
    pub id: String,
    /// 취약점 네임스페이스 (예: debian:12)
    pub namespace: String,
    /// 영향받는 패키지명
    pub package: String,
    /// 설치된 버전
    pub version: String,
    /// 수정된 버전 (있을 경우)
    pub fixed_by: Option<String>,
    /// 심각도
    pub severity: Severity,
    /// 점수 (CVSS 또는 심각도 기반 기본값)
    pub score: f64,
    /// 참고 링크
    pub link: Option<String>,
}

impl fmt::Display for Vulnerability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} {:.1}] {} {} (fixed: {})",
            self.id,
            self.severity,
            self.score,
            self.package,
            self.version,
            self.fixed_by.as_deref().unwrap_or("N/A"),
        )
    }
}
