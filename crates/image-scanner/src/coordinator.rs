//! 스캔 코디네이터
//!
//! 레이어 체인을 Clair에 base → tip 순서로 하나씩 제출합니다.
//!
//! # 처리 흐름
//!
//! ```text
//! cleanup(tip) ──▶ submit(0) ──▶ submit(1) ──▶ ... ──▶ submit(n-1)
//!  (best effort)      │ 실패 시 즉시 중단, 0..i-1 은 부분 진행으로 보고
//! ```
//!
//! - 정리(DELETE)는 이전 실행의 최종 레이어를 대상으로 합니다. 레이어 이름이
//!   내용 주소(digest)이므로 같은 이미지의 이전 실행 tip은 현재 체인의 tip과 같습니다.
//! - 404는 "정리할 것 없음"이며, 그 외 실패는 경고 로그만 남깁니다.
//! - 제출은 엄격히 순차적이며, 자식은 부모가 성공한 뒤에만 제출됩니다.
//! - 제출 POST는 자동 재시도하지 않습니다.

use serde::Serialize;

use yair_core::metrics as m;

use crate::clair::{ClairClient, CleanupOutcome, ScanRequest};
use crate::error::ImageScanError;
use crate::layers::LayerChain;
use crate::registry::blob_url;

/// 체인 제출 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReport {
    /// 색인된 레이어 (base부터 순서대로)
    pub indexed: Vec<String>,
}

/// Clair 제출 코디네이터
pub struct ScanCoordinator<'a, C> {
    clair: &'a C,
}

impl<'a, C: ClairClient> ScanCoordinator<'a, C> {
    /// 새 코디네이터를 만듭니다.
    pub fn new(clair: &'a C) -> Self {
        Self { clair }
    }

    /// 이전 실행의 최종 레이어 색인을 삭제합니다. 실패해도 스캔은 계속됩니다.
    pub async fn cleanup(&self, chain: &LayerChain) -> CleanupOutcome {
        let layer = chain.tip();
        let outcome = self.clair.delete_layer(layer).await;

        match &outcome {
            CleanupOutcome::Deleted => {
                tracing::info!(layer, "removed stale layer index entry");
            }
            CleanupOutcome::NothingToClean => {
                tracing::debug!(layer, "nothing to clean");
            }
            CleanupOutcome::Failed { reason } => {
                tracing::warn!(layer, reason = %reason, "cleanup failed, continuing");
            }
        }
        metrics::counter!(m::CLAIR_CLEANUP_TOTAL, m::LABEL_RESULT => outcome.as_label())
            .increment(1);

        outcome
    }

    /// 체인을 base → tip 순서로 제출합니다.
    ///
    /// # Errors
    ///
    /// i번째 레이어 제출이 실패하면 i+1 이후는 제출하지 않고
    /// 0..i-1 을 담은 [`ImageScanError::LayerSubmission`]을 반환합니다.
    pub async fn submit_chain(
        &self,
        chain: &LayerChain,
        manifest_url: &str,
        authorization: Option<&str>,
    ) -> Result<SubmissionReport, ImageScanError> {
        let mut indexed = Vec::with_capacity(chain.len());

        for (index, layer) in chain.iter().enumerate() {
            let request = ScanRequest::new(
                layer,
                chain.parent_of(index),
                blob_url(manifest_url, layer),
                authorization.map(str::to_owned),
            );

            if let Err(e) = self.clair.submit_layer(&request).await {
                metrics::counter!(m::CLAIR_LAYERS_SUBMITTED_TOTAL, m::LABEL_RESULT => "failure")
                    .increment(1);
                tracing::error!(
                    index,
                    layer,
                    indexed = indexed.len(),
                    error = %e,
                    "layer submission failed, aborting chain"
                );
                return Err(ImageScanError::LayerSubmission {
                    index,
                    layer: layer.to_owned(),
                    indexed,
                    reason: e.to_string(),
                });
            }

            metrics::counter!(m::CLAIR_LAYERS_SUBMITTED_TOTAL, m::LABEL_RESULT => "success")
                .increment(1);
            tracing::info!(index, total = chain.len(), layer, "layer indexed");
            indexed.push(layer.to_owned());
        }

        Ok(SubmissionReport { indexed })
    }
}
