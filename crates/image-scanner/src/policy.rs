//! 정책 평가기
//!
//! 발견된 취약점 목록을 [`PolicyThresholds`]와 비교하여 [`Verdict`]를 결정합니다.
//! 순수 함수이며 I/O가 없습니다.
//!
//! # 점수 집계
//!
//! 이미지 점수 = 모든 취약점 점수의 최댓값 (취약점이 없으면 0).
//! 이미지 점수가 `max_score`를 **초과**하면 실패합니다 (같으면 통과).

use std::fmt;

use serde::Serialize;

use yair_core::types::{Severity, Vulnerability};

/// 정책 임계값
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyThresholds {
    /// 허용 최대 이미지 점수 (0-10)
    pub max_score: f64,
    /// 치명적 등급 취약점이 있으면 실패
    pub fail_on_big_vulnerability: bool,
}

/// 실패 사유
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailReason {
    /// 이미지 점수가 임계값 초과
    ScoreExceeded {
        /// 이미지 점수
        score: f64,
        /// 허용 최대 점수
        max_score: f64,
    },
    /// 치명적 등급 취약점 존재
    BigVulnerability {
        /// 치명적 등급 취약점 ID 목록
        ids: Vec<String>,
    },
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScoreExceeded { score, max_score } => {
                write!(f, "image score {score:.1} exceeds maximum {max_score:.1}")
            }
            Self::BigVulnerability { ids } => {
                write!(f, "{} critical vulnerability(ies): {}", ids.len(), ids.join(", "))
            }
        }
    }
}

/// 정책 평가 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", content = "reasons", rename_all = "snake_case")]
pub enum Verdict {
    /// 통과
    Pass,
    /// 실패 (사유 1개 이상)
    Fail(Vec<FailReason>),
}

impl Verdict {
    /// 통과 여부
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// 메트릭 레이블 값
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail(_) => "fail",
        }
    }
}

/// 이미지 점수 (최댓값 집계, 취약점이 없으면 0)
pub fn image_score(findings: &[Vulnerability]) -> f64 {
    findings.iter().map(|v| v.score).fold(0.0, f64::max)
}

/// 취약점 목록을 임계값과 비교합니다.
///
/// 두 조건이 모두 해당하면 두 사유를 모두 보고합니다.
pub fn evaluate(findings: &[Vulnerability], thresholds: &PolicyThresholds) -> Verdict {
    let mut reasons = Vec::new();

    let score = image_score(findings);
    if score > thresholds.max_score {
        reasons.push(FailReason::ScoreExceeded {
            score,
            max_score: thresholds.max_score,
        });
    }

    if thresholds.fail_on_big_vulnerability {
        let mut ids: Vec<String> = findings
            .iter()
            .filter(|v| v.severity.is_critical_tier())
            .map(|v| v.id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        if !ids.is_empty() {
            reasons.push(FailReason::BigVulnerability { ids });
        }
    }

    if reasons.is_empty() {
        Verdict::Pass
    } else {
        Verdict::Fail(reasons)
    }
}

/// 심각도별 취약점 수
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    /// Defcon1
    pub defcon1: usize,
    /// Critical
    pub critical: usize,
    /// High
    pub high: usize,
    /// Medium
    pub medium: usize,
    /// Low
    pub low: usize,
    /// Negligible
    pub negligible: usize,
    /// Unknown
    pub unknown: usize,
}

impl SeverityCounts {
    /// 취약점 목록에서 집계합니다.
    pub fn from_findings(findings: &[Vulnerability]) -> Self {
        let mut counts = Self::default();
        for v in findings {
            match v.severity {
                Severity::Defcon1 => counts.defcon1 += 1,
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
                Severity::Negligible => counts.negligible += 1,
                Severity::Unknown => counts.unknown += 1,
            }
        }
        counts
    }

    /// 전체 수
    pub fn total(&self) -> usize {
        self.defcon1
            + self.critical
            + self.high
            + self.medium
            + self.low
            + self.negligible
            + self.unknown
    }
}
