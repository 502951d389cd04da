//! 스캔 흐름 통합 테스트
//!
//! mock 레지스트리/Clair로 매니페스트 조회 → 체인 해석 → 정리 → 순차 제출 →
//! 보고서 조회 → 정책 평가 흐름을 검증합니다.

mod common;

use std::sync::Arc;

use common::{
    ClairCall, MANIFEST_URL, MockClair, MockRegistry, RegistryBehaviour, finding, v1_manifest,
    v2_manifest,
};
use yair_core::types::Severity;
use yair_image_scanner::{
    CleanupOutcome, CredentialProvider, ImageReference, ImageScanError, ImageScanner,
    PolicyThresholds, StaticCredentials, Verdict,
};

fn thresholds(max_score: f64, big: bool) -> PolicyThresholds {
    PolicyThresholds {
        max_score,
        fail_on_big_vulnerability: big,
    }
}

fn scanner(
    registry: MockRegistry,
    clair: MockClair,
    thresholds: PolicyThresholds,
) -> ImageScanner<MockRegistry, MockClair> {
    let credentials: Arc<dyn CredentialProvider> =
        Arc::new(StaticCredentials::new(Some("token".to_owned())));
    ImageScanner::new(registry, clair, thresholds, credentials)
}

fn image() -> ImageReference {
    ImageReference::parse("app:1.0", true).unwrap()
}

#[tokio::test]
async fn v1_chain_is_submitted_base_first_with_parents() {
    let clair = MockClair::new();
    let calls = Arc::clone(&clair.calls);
    let scanner = scanner(
        MockRegistry::serving(v1_manifest(&["sha256:c", "sha256:b", "sha256:a"])),
        clair,
        thresholds(10.0, false),
    );

    let outcome = scanner.scan(&image()).await.unwrap();
    assert_eq!(outcome.layers.as_slice(), ["sha256:a", "sha256:b", "sha256:c"]);
    assert_eq!(outcome.indexed, ["sha256:a", "sha256:b", "sha256:c"]);
    assert_eq!(outcome.schema_version, 1);

    let submissions: Vec<_> = calls
        .lock()
        .await
        .iter()
        .filter_map(|c| match c {
            ClairCall::Submit(r) => Some(r.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(submissions.len(), 3);
    assert_eq!(submissions[0].name, "sha256:a");
    assert_eq!(submissions[0].parent_name, None);
    assert_eq!(submissions[1].parent_name.as_deref(), Some("sha256:a"));
    assert_eq!(submissions[2].parent_name.as_deref(), Some("sha256:b"));
    assert_eq!(
        submissions[2].path,
        "http://registry.test:80/v2/library/app/blobs/sha256:c"
    );
    assert_eq!(submissions[0].format, "Docker");
    assert_eq!(
        submissions[0].headers.as_ref().map(|h| h.authorization.as_str()),
        Some("Bearer token")
    );
}

#[tokio::test]
async fn v2_chain_keeps_manifest_order() {
    let scanner = scanner(
        MockRegistry::serving(v2_manifest(&["sha256:x", "sha256:y", "sha256:z"])),
        MockClair::new(),
        thresholds(10.0, false),
    );
    let outcome = scanner.scan(&image()).await.unwrap();
    assert_eq!(outcome.indexed, ["sha256:x", "sha256:y", "sha256:z"]);
    assert_eq!(outcome.manifest_url, MANIFEST_URL);
}

#[tokio::test]
async fn every_chain_length_gets_exactly_n_ordered_submissions() {
    for n in 1..=8 {
        let digests: Vec<String> = (0..n).map(|i| format!("sha256:{i:02}")).collect();
        let refs: Vec<&str> = digests.iter().map(String::as_str).collect();

        let clair = MockClair::new();
        let calls = Arc::clone(&clair.calls);
        let scanner = scanner(
            MockRegistry::serving(v2_manifest(&refs)),
            clair,
            thresholds(10.0, false),
        );
        scanner.scan(&image()).await.unwrap();

        let submitted: Vec<(String, Option<String>)> = calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                ClairCall::Submit(r) => Some((r.name.clone(), r.parent_name.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(submitted.len(), n, "chain length {n}");
        for (i, (name, parent)) in submitted.iter().enumerate() {
            assert_eq!(name, &digests[i]);
            let expected = if i == 0 { None } else { Some(digests[i - 1].clone()) };
            assert_eq!(parent, &expected);
        }
    }
}

#[tokio::test]
async fn submission_failure_stops_the_chain_and_reports_prefix() {
    let mut clair = MockClair::new();
    clair.fail_submit_at = Some(2);
    let calls = Arc::clone(&clair.calls);
    let scanner = scanner(
        MockRegistry::serving(v2_manifest(&["l0", "l1", "l2", "l3", "l4"])),
        clair,
        thresholds(10.0, false),
    );

    let err = scanner.scan(&image()).await.unwrap_err();
    match err {
        ImageScanError::LayerSubmission {
            index,
            layer,
            indexed,
            ..
        } => {
            assert_eq!(index, 2);
            assert_eq!(layer, "l2");
            assert_eq!(indexed, ["l0", "l1"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let calls = calls.lock().await;
    let submitted: Vec<&str> = calls
        .iter()
        .filter_map(|c| match c {
            ClairCall::Submit(r) => Some(r.name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(submitted, ["l0", "l1", "l2"]);
    assert!(!calls.iter().any(|c| matches!(c, ClairCall::Report(_))));
}

#[tokio::test]
async fn base_layer_failure_reports_empty_prefix() {
    let mut clair = MockClair::new();
    clair.fail_submit_at = Some(0);
    let scanner = scanner(
        MockRegistry::serving(v2_manifest(&["l0", "l1"])),
        clair,
        thresholds(10.0, false),
    );
    let err = scanner.scan(&image()).await.unwrap_err();
    assert!(matches!(
        err,
        ImageScanError::LayerSubmission { index: 0, ref indexed, .. } if indexed.is_empty()
    ));
}

#[tokio::test]
async fn manifest_not_found_stops_before_clair() {
    let clair = MockClair::new();
    let calls = Arc::clone(&clair.calls);
    let scanner = scanner(
        MockRegistry::new(RegistryBehaviour::NotFound),
        clair,
        thresholds(10.0, false),
    );
    let err = scanner.scan(&image()).await.unwrap_err();
    assert!(matches!(err, ImageScanError::RegistryNotFound { .. }));
    assert_eq!(err.stage(), "manifest fetch");
    assert!(calls.lock().await.is_empty());
}

#[tokio::test]
async fn registry_transport_error_is_distinct_from_not_found() {
    let scanner = scanner(
        MockRegistry::new(RegistryBehaviour::Status(500)),
        MockClair::new(),
        thresholds(10.0, false),
    );
    let err = scanner.scan(&image()).await.unwrap_err();
    assert!(matches!(
        err,
        ImageScanError::RegistryTransport {
            status: Some(500),
            ..
        }
    ));
}

#[tokio::test]
async fn unknown_schema_version_is_rejected_before_clair() {
    let mut manifest = v2_manifest(&["x"]);
    manifest.schema_version = 3;
    let clair = MockClair::new();
    let calls = Arc::clone(&clair.calls);
    let scanner = scanner(MockRegistry::serving(manifest), clair, thresholds(10.0, false));

    let err = scanner.scan(&image()).await.unwrap_err();
    assert!(matches!(
        err,
        ImageScanError::UnsupportedManifestSchema {
            schema_version: 3,
            ..
        }
    ));
    assert!(calls.lock().await.is_empty());
}

#[tokio::test]
async fn empty_manifest_is_an_error() {
    let scanner = scanner(
        MockRegistry::serving(v2_manifest(&[])),
        MockClair::new(),
        thresholds(10.0, false),
    );
    let err = scanner.scan(&image()).await.unwrap_err();
    assert!(matches!(err, ImageScanError::EmptyManifest { schema_version: 2 }));
}

#[tokio::test]
async fn cleanup_targets_tip_before_first_submission() {
    let clair = MockClair::new();
    let calls = Arc::clone(&clair.calls);
    let scanner = scanner(
        MockRegistry::serving(v1_manifest(&["top", "mid", "base"])),
        clair,
        thresholds(10.0, false),
    );
    let outcome = scanner.scan(&image()).await.unwrap();
    assert_eq!(outcome.cleanup, CleanupOutcome::NothingToClean);

    let calls = calls.lock().await;
    assert_eq!(calls[0], ClairCall::Delete("top".to_owned()));
    assert!(matches!(calls[1], ClairCall::Submit(ref r) if r.name == "base"));
    assert_eq!(calls.last(), Some(&ClairCall::Report("top".to_owned())));
}

#[tokio::test]
async fn cleanup_failure_does_not_stop_the_run() {
    let mut clair = MockClair::new();
    clair.cleanup = CleanupOutcome::Failed {
        reason: "unexpected status 500".to_owned(),
    };
    let scanner = scanner(
        MockRegistry::serving(v2_manifest(&["a", "b"])),
        clair,
        thresholds(10.0, false),
    );
    let outcome = scanner.scan(&image()).await.unwrap();
    assert!(matches!(outcome.cleanup, CleanupOutcome::Failed { .. }));
    assert_eq!(outcome.indexed, ["a", "b"]);
    assert!(outcome.verdict.is_pass());
}

#[tokio::test]
async fn high_score_yields_fail_verdict_not_error() {
    let mut clair = MockClair::new();
    clair.findings = vec![
        finding("CVE-1", Severity::High, 9.0),
        finding("CVE-2", Severity::Low, 3.0),
    ];
    let scanner = scanner(
        MockRegistry::serving(v2_manifest(&["a"])),
        clair,
        thresholds(8.0, false),
    );
    let outcome = scanner.scan(&image()).await.unwrap();
    assert_eq!(outcome.image_score, 9.0);
    assert!(matches!(outcome.verdict, Verdict::Fail(ref r) if r.len() == 1));
    assert_eq!(outcome.severity_counts.high, 1);
}

#[tokio::test]
async fn low_score_passes() {
    let mut clair = MockClair::new();
    clair.findings = vec![finding("CVE-1", Severity::Medium, 5.0)];
    let scanner = scanner(
        MockRegistry::serving(v2_manifest(&["a"])),
        clair,
        thresholds(8.0, false),
    );
    let outcome = scanner.scan(&image()).await.unwrap();
    assert_eq!(outcome.verdict, Verdict::Pass);
}

#[tokio::test]
async fn report_failure_is_fatal() {
    let mut clair = MockClair::new();
    clair.fail_report = true;
    let scanner = scanner(
        MockRegistry::serving(v2_manifest(&["a"])),
        clair,
        thresholds(10.0, false),
    );
    let err = scanner.scan(&image()).await.unwrap_err();
    assert!(matches!(err, ImageScanError::ClairTransport { .. }));
    assert_eq!(err.stage(), "vulnerability report");
}

#[tokio::test]
async fn anonymous_registry_sends_no_headers() {
    let clair = MockClair::new();
    let calls = Arc::clone(&clair.calls);
    let credentials: Arc<dyn CredentialProvider> = Arc::new(StaticCredentials::anonymous());
    let scanner = ImageScanner::new(
        MockRegistry::serving(v2_manifest(&["a"])),
        clair,
        thresholds(10.0, false),
        credentials,
    );
    scanner.scan(&image()).await.unwrap();
    let calls = calls.lock().await;
    assert!(calls.iter().all(|c| match c {
        ClairCall::Submit(r) => r.headers.is_none(),
        _ => true,
    }));
}

#[tokio::test]
async fn outcome_serializes_for_json_output() {
    let mut clair = MockClair::new();
    clair.findings = vec![finding("CVE-9", Severity::Critical, 9.8)];
    let scanner = scanner(
        MockRegistry::serving(v2_manifest(&["a", "b"])),
        clair,
        thresholds(10.0, true),
    );
    let outcome = scanner.scan(&image()).await.unwrap();
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["image"], "library/app:1.0");
    assert_eq!(json["layers"], serde_json::json!(["a", "b"]));
    assert_eq!(json["verdict"]["verdict"], "fail");
    assert_eq!(json["cleanup"]["outcome"], "nothing_to_clean");
    assert_eq!(json["findings"][0]["id"], "CVE-9");
}
