//! 레지스트리 매니페스트 디코딩
//!
//! 레지스트리가 반환한 JSON 본문을 [`Manifest`]로 역직렬화합니다.
//! 스키마 판별(`schemaVersion`, `mediaType`)은 레이어 체인 빌더가 수행하므로
//! 여기서는 모든 필드를 관대하게(기본값 허용) 읽어 둡니다.
//!
//! # 지원 형태
//!
//! - schema v1: `fsLayers[].blobSum` (tip → base 순서)
//! - schema v2 / OCI image manifest: `layers[].digest` (base → tip 순서)
//! - manifest list / OCI index: `manifests[]` (체인 빌더가 거부)

use serde::{Deserialize, Serialize};

/// Docker v2 이미지 매니페스트 미디어 타입
pub const MEDIA_TYPE_DOCKER_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// Docker v1 서명 매니페스트 미디어 타입
pub const MEDIA_TYPE_DOCKER_V1_SIGNED: &str =
    "application/vnd.docker.distribution.manifest.v1+prettyjws";

/// Docker manifest list 미디어 타입
pub const MEDIA_TYPE_DOCKER_LIST: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";

/// OCI image index 미디어 타입
pub const MEDIA_TYPE_OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";

/// 레지스트리 매니페스트 원본
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// 스키마 버전 (1 또는 2)
    #[serde(default)]
    pub schema_version: u32,
    /// 미디어 타입 (v2 이상에서만 존재)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// v1 레이어 목록 (tip → base)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fs_layers: Vec<FsLayer>,
    /// v2 레이어 목록 (base → tip)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layers: Vec<LayerDescriptor>,
    /// manifest list / index 항목
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manifests: Vec<PlatformManifest>,
}

/// v1 `fsLayers` 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsLayer {
    /// 레이어 blob digest
    pub blob_sum: String,
}

/// v2 `layers` 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    /// 레이어 blob digest
    pub digest: String,
    /// 레이어 미디어 타입
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// 압축된 크기 (바이트)
    #[serde(default)]
    pub size: u64,
}

/// manifest list / index 항목 (플랫폼별 매니페스트 참조)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformManifest {
    /// 참조 매니페스트 digest
    pub digest: String,
    /// 참조 매니페스트 미디어 타입
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl Manifest {
    /// JSON 바이트에서 매니페스트를 디코딩합니다.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// 여러 플랫폼을 가리키는 매니페스트 목록인지 확인합니다.
    ///
    /// `mediaType`이 목록/인덱스 타입이거나, 레이어 없이 `manifests`만 있는 경우입니다.
    pub fn is_manifest_list(&self) -> bool {
        let listed_type = matches!(
            self.media_type.as_deref(),
            Some(MEDIA_TYPE_DOCKER_LIST | MEDIA_TYPE_OCI_INDEX)
        );
        listed_type || (!self.manifests.is_empty() && self.layers.is_empty())
    }
}
