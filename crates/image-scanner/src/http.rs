//! reqwest 클라이언트 생성과 멱등 요청 재시도
//!
//! GET/DELETE는 연결 실패나 타임아웃일 때 한 번 재시도합니다.
//! 레이어 제출 POST는 이 헬퍼를 쓰지 않습니다 (재시도 없음).

use std::time::Duration;

use crate::error::ImageScanError;

/// 멱등 요청의 최대 시도 횟수 (최초 1회 + 재시도 1회)
pub(crate) const MAX_IDEMPOTENT_ATTEMPTS: u32 = 2;

const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// 타임아웃과 TLS 검증 정책을 적용한 클라이언트를 만듭니다.
pub(crate) fn build_client(
    timeout: Duration,
    ssl_verify: bool,
) -> Result<reqwest::Client, ImageScanError> {
    if !ssl_verify {
        tracing::warn!("TLS certificate verification is disabled");
    }
    reqwest::Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(!ssl_verify)
        .user_agent(concat!("yair/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ImageScanError::ClientBuild(e.to_string()))
}

/// 연결 실패 또는 타임아웃일 때만 한 번 재시도합니다.
///
/// 응답을 받은 경우(상태 코드와 무관)는 재시도하지 않고 그대로 돌려줍니다.
pub(crate) async fn send_idempotent<F>(make_request: F) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match make_request().send().await {
            Err(e) if attempt < MAX_IDEMPOTENT_ATTEMPTS && (e.is_connect() || e.is_timeout()) => {
                tracing::debug!(attempt, error = %e, "request failed, retrying once");
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
            result => return result,
        }
    }
}

/// 에러 메시지용으로 reqwest 에러를 분류합니다.
pub(crate) fn describe(e: &reqwest::Error) -> String {
    let kind = if e.is_timeout() {
        "timed out"
    } else if e.is_connect() {
        "connection failed"
    } else if e.is_decode() {
        "invalid response body"
    } else {
        "request failed"
    };
    format!("{kind}: {e}")
}
