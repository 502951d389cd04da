//! 이미지 스캐너 에러 타입
//!
//! [`ImageScanError`]는 스캔 실행 중 발생할 수 있는 모든 실패를 단계별로 나타냅니다.
//! 모든 변형은 사용자에게 보고할 수 있을 만큼의 컨텍스트(URL, 상태 코드, 레이어)를 담으며,
//! 어떤 실패도 빈 결과로 대체되지 않습니다.
//!
//! # 에러 카테고리
//!
//! - **설정**: `Config`, `ClientBuild`
//! - **이미지 참조**: `ImageResolution`
//! - **레지스트리**: `RegistryNotFound`, `RegistryTransport`
//! - **매니페스트**: `UnsupportedManifestSchema`, `EmptyManifest`
//! - **Clair**: `LayerSubmission`, `ClairTransport`

/// 이미지 스캐너 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ImageScanError {
    /// 병합된 설정이 유효하지 않음
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// HTTP 클라이언트 생성 실패 (TLS 백엔드 초기화 등)
    #[error("failed to build http client: {0}")]
    ClientBuild(String),

    /// 이미지 참조 문자열이 잘못됨
    #[error("invalid image reference '{input}': {reason}")]
    ImageResolution {
        /// 사용자 입력
        input: String,
        /// 실패 사유
        reason: String,
    },

    /// 레지스트리에 이미지 또는 태그가 없음 (HTTP 404)
    #[error("image not found in registry: {url}")]
    RegistryNotFound {
        /// 조회한 매니페스트 URL
        url: String,
    },

    /// 레지스트리 통신 실패 (연결, TLS, 예상하지 못한 상태 코드, 잘못된 본문)
    #[error("registry request failed: {url}: {reason}")]
    RegistryTransport {
        /// 요청 URL
        url: String,
        /// HTTP 상태 코드 (응답을 받은 경우)
        status: Option<u16>,
        /// 실패 사유
        reason: String,
    },

    /// 지원하지 않는 매니페스트 스키마
    #[error("unsupported manifest schema: {detail}")]
    UnsupportedManifestSchema {
        /// 매니페스트의 schemaVersion
        schema_version: u32,
        /// 상세 설명
        detail: String,
    },

    /// 레이어가 하나도 없는 매니페스트
    #[error("manifest (schema {schema_version}) lists no layers")]
    EmptyManifest {
        /// 매니페스트의 schemaVersion
        schema_version: u32,
    },

    /// 레이어 제출 실패. 이후 레이어는 제출되지 않음
    #[error(
        "layer {index} ({layer}) was not indexed: {reason} ({} earlier layer(s) indexed)",
        .indexed.len()
    )]
    LayerSubmission {
        /// 실패한 레이어의 체인 내 위치 (0 = base)
        index: usize,
        /// 실패한 레이어 digest
        layer: String,
        /// 실패 전에 색인이 완료된 레이어 (base부터 순서대로)
        indexed: Vec<String>,
        /// 실패 사유
        reason: String,
    },

    /// Clair 조회 실패 (취약점 보고서 조회)
    #[error("clair request failed: {url}: {reason}")]
    ClairTransport {
        /// 요청 URL
        url: String,
        /// HTTP 상태 코드 (응답을 받은 경우)
        status: Option<u16>,
        /// 실패 사유
        reason: String,
    },
}

impl ImageScanError {
    /// 실패한 단계 이름을 반환합니다 (사용자 메시지용).
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Config { .. } | Self::ClientBuild(_) => "configuration",
            Self::ImageResolution { .. } => "image resolution",
            Self::RegistryNotFound { .. } | Self::RegistryTransport { .. } => "manifest fetch",
            Self::UnsupportedManifestSchema { .. } | Self::EmptyManifest { .. } => {
                "layer resolution"
            }
            Self::LayerSubmission { .. } => "layer submission",
            Self::ClairTransport { .. } => "vulnerability report",
        }
    }
}
