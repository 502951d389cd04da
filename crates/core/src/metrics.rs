//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 스캐너는 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더가 설치되지 않으면 호출은 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `yair_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 스키마 버전 레이블 키 (1, 2)
pub const LABEL_SCHEMA: &str = "schema";

// ─── 레지스트리 메트릭 ─────────────────────────────────────────────

/// 매니페스트 조회 수 (counter, label: result)
pub const REGISTRY_MANIFEST_REQUESTS_TOTAL: &str = "yair_registry_manifest_requests_total";

/// 해석된 레이어 체인 수 (counter, label: schema)
pub const LAYER_CHAINS_BUILT_TOTAL: &str = "yair_layer_chains_built_total";

// ─── Clair 메트릭 ──────────────────────────────────────────────────

/// 제출된 레이어 수 (counter, label: result)
pub const CLAIR_LAYERS_SUBMITTED_TOTAL: &str = "yair_clair_layers_submitted_total";

/// 정리(삭제) 요청 수 (counter, label: result)
pub const CLAIR_CLEANUP_TOTAL: &str = "yair_clair_cleanup_total";

/// 전체 스캔 소요 시간 (histogram, 초)
pub const SCAN_DURATION_SECONDS: &str = "yair_scan_duration_seconds";

/// 정책 평가 결과 수 (counter, label: result)
pub const POLICY_VERDICTS_TOTAL: &str = "yair_policy_verdicts_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        REGISTRY_MANIFEST_REQUESTS_TOTAL,
        "Manifest fetches against the registry, by result"
    );
    describe_counter!(
        LAYER_CHAINS_BUILT_TOTAL,
        "Layer chains resolved from manifests, by schema version"
    );
    describe_counter!(
        CLAIR_LAYERS_SUBMITTED_TOTAL,
        "Layer indexing requests sent to Clair, by result"
    );
    describe_counter!(
        CLAIR_CLEANUP_TOTAL,
        "Stale layer cleanup requests sent to Clair, by result"
    );
    describe_histogram!(
        SCAN_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Wall time of a full image scan"
    );
    describe_counter!(
        POLICY_VERDICTS_TOTAL,
        "Policy evaluations, by verdict"
    );
}
