//! 이미지 스캐너 오케스트레이터 -- 전체 스캔 흐름 관리
//!
//! # 내부 아키텍처
//!
//! ```text
//! ImageReference --> RegistryClient --> Manifest --> LayerChain
//!                                                        |
//!                                            ScanCoordinator (cleanup, submit)
//!                                                        |
//!                                     ClairClient::layer_vulnerabilities(tip)
//!                                                        |
//!                                               policy::evaluate --> ScanOutcome
//! ```
//!
//! 모든 단계의 치명적 에러는 즉시 반환되며, 정리(cleanup) 실패만 경고로 처리됩니다.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::Instrument;

use yair_core::metrics as m;
use yair_core::types::Vulnerability;

use crate::clair::{ClairClient, CleanupOutcome, HttpClairClient};
use crate::coordinator::ScanCoordinator;
use crate::credentials::{CredentialProvider, StaticCredentials};
use crate::error::ImageScanError;
use crate::layers::LayerChain;
use crate::policy::{self, PolicyThresholds, SeverityCounts, Verdict};
use crate::reference::ImageReference;
use crate::registry::{HttpRegistryClient, RegistryClient};
use crate::settings::ScanSettings;

/// 한 번의 스캔 결과
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanOutcome {
    /// 실행 ID (로그 상관용)
    pub run_id: String,
    /// 스캔한 이미지
    pub image: String,
    /// 매니페스트 URL
    pub manifest_url: String,
    /// 매니페스트 스키마 버전
    pub schema_version: u32,
    /// base → tip 레이어 체인
    pub layers: LayerChain,
    /// 정리 결과
    pub cleanup: CleanupOutcome,
    /// 색인된 레이어
    pub indexed: Vec<String>,
    /// 발견된 취약점 (점수 내림차순)
    pub findings: Vec<Vulnerability>,
    /// 심각도별 취약점 수
    pub severity_counts: SeverityCounts,
    /// 이미지 점수 (최댓값 집계)
    pub image_score: f64,
    /// 적용된 임계값
    pub thresholds: PolicyThresholds,
    /// 정책 평가 결과
    pub verdict: Verdict,
}

/// 이미지 스캐너
///
/// 레지스트리와 Clair 클라이언트를 주입받아 한 이미지의 스캔 흐름을 실행합니다.
pub struct ImageScanner<R, C> {
    registry: R,
    clair: C,
    thresholds: PolicyThresholds,
    credentials: Arc<dyn CredentialProvider>,
}

impl ImageScanner<HttpRegistryClient, HttpClairClient> {
    /// 해석된 설정으로 HTTP 클라이언트 기반 스캐너를 만듭니다.
    ///
    /// # Errors
    ///
    /// HTTP 클라이언트 생성에 실패하면 [`ImageScanError::ClientBuild`]를 반환합니다.
    pub fn from_settings(settings: &ScanSettings) -> Result<Self, ImageScanError> {
        let credentials: Arc<dyn CredentialProvider> =
            Arc::new(StaticCredentials::new(settings.registry.token.clone()));
        let registry = HttpRegistryClient::new(settings.registry.clone(), Arc::clone(&credentials))?;
        let clair = HttpClairClient::new(&settings.clair)?;
        Ok(Self::new(
            registry,
            clair,
            settings.thresholds.clone(),
            credentials,
        ))
    }
}

impl<R: RegistryClient, C: ClairClient> ImageScanner<R, C> {
    /// 클라이언트를 직접 지정하여 스캐너를 만듭니다.
    pub fn new(
        registry: R,
        clair: C,
        thresholds: PolicyThresholds,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            registry,
            clair,
            thresholds,
            credentials,
        }
    }

    /// 이미지를 스캔합니다.
    ///
    /// 정책 실패는 에러가 아니라 [`Verdict::Fail`]로 반환됩니다.
    ///
    /// # Errors
    ///
    /// 매니페스트 조회, 레이어 해석, 레이어 제출, 취약점 조회 중 하나라도
    /// 실패하면 해당 단계의 [`ImageScanError`]를 반환합니다.
    pub async fn scan(&self, reference: &ImageReference) -> Result<ScanOutcome, ImageScanError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("scan", run_id = %run_id, image = %reference);

        let started = Instant::now();
        let result = self.run(run_id, reference).instrument(span).await;
        metrics::histogram!(m::SCAN_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        result
    }

    async fn run(
        &self,
        run_id: String,
        reference: &ImageReference,
    ) -> Result<ScanOutcome, ImageScanError> {
        tracing::info!("fetching manifest");
        let fetched = self.registry.fetch_manifest(reference).await?;
        let layers = LayerChain::from_manifest(&fetched.manifest)?;
        tracing::info!(layers = layers.len(), tip = layers.tip(), "layer chain resolved");

        let coordinator = ScanCoordinator::new(&self.clair);
        let cleanup = coordinator.cleanup(&layers).await;

        let authorization = self.credentials.authorization_header();
        let report = coordinator
            .submit_chain(&layers, &fetched.url, authorization.as_deref())
            .await?;

        let findings = self.clair.layer_vulnerabilities(layers.tip()).await?;
        let image_score = policy::image_score(&findings);
        let verdict = policy::evaluate(&findings, &self.thresholds);
        metrics::counter!(m::POLICY_VERDICTS_TOTAL, m::LABEL_RESULT => verdict.as_label())
            .increment(1);

        tracing::info!(
            findings = findings.len(),
            image_score,
            verdict = verdict.as_label(),
            "scan finished"
        );

        Ok(ScanOutcome {
            run_id,
            image: reference.to_string(),
            manifest_url: fetched.url,
            schema_version: fetched.manifest.schema_version,
            layers,
            cleanup,
            indexed: report.indexed,
            severity_counts: SeverityCounts::from_findings(&findings),
            findings,
            image_score,
            thresholds: self.thresholds.clone(),
            verdict,
        })
    }
}
