//! 레이어 체인 빌더
//!
//! 매니페스트를 base → tip 순서의 [`LayerChain`]으로 변환합니다.
//!
//! - schema v1: `fsLayers`가 tip부터 나열되므로 뒤집습니다.
//! - schema v2: `layers`가 base부터 나열되므로 그대로 사용합니다.
//!
//! 체인의 i번째(i > 0) 레이어의 부모는 i-1번째 레이어입니다.
//! 체인은 절대 비어 있지 않습니다.

use serde::Serialize;

use yair_core::metrics as m;

use crate::error::ImageScanError;
use crate::manifest::Manifest;

/// base → tip 순서의 레이어 digest 목록 (비어 있지 않음)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LayerChain {
    layers: Vec<String>,
}

impl LayerChain {
    /// 매니페스트에서 레이어 체인을 만듭니다.
    ///
    /// # Errors
    ///
    /// - manifest list / OCI index 또는 알 수 없는 `schemaVersion`:
    ///   [`ImageScanError::UnsupportedManifestSchema`]
    /// - 레이어가 없는 매니페스트: [`ImageScanError::EmptyManifest`]
    pub fn from_manifest(manifest: &Manifest) -> Result<Self, ImageScanError> {
        let schema_version = manifest.schema_version;

        if manifest.is_manifest_list() {
            let media_type = manifest
                .media_type
                .as_deref()
                .unwrap_or("manifest list without mediaType");
            return Err(ImageScanError::UnsupportedManifestSchema {
                schema_version,
                detail: format!(
                    "{media_type} references {} platform manifest(s); request a single-platform tag or digest",
                    manifest.manifests.len()
                ),
            });
        }

        let layers: Vec<String> = match schema_version {
            1 => manifest
                .fs_layers
                .iter()
                .rev()
                .map(|l| l.blob_sum.clone())
                .collect(),
            2 => manifest.layers.iter().map(|l| l.digest.clone()).collect(),
            other => {
                return Err(ImageScanError::UnsupportedManifestSchema {
                    schema_version: other,
                    detail: format!("schemaVersion {other} is not 1 or 2"),
                });
            }
        };

        if layers.is_empty() {
            return Err(ImageScanError::EmptyManifest { schema_version });
        }

        metrics::counter!(m::LAYER_CHAINS_BUILT_TOTAL, m::LABEL_SCHEMA => schema_version.to_string())
            .increment(1);
        tracing::debug!(schema_version, layers = layers.len(), "layer chain built");

        Ok(Self { layers })
    }

    /// 레이어 수 (항상 1 이상)
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// 체인은 비어 있을 수 없으므로 항상 `false`입니다.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// base 레이어
    pub fn base(&self) -> &str {
        &self.layers[0]
    }

    /// 최상위(tip) 레이어
    pub fn tip(&self) -> &str {
        &self.layers[self.layers.len() - 1]
    }

    /// `index` 위치 레이어의 부모 (base이거나 범위를 벗어나면 `None`)
    pub fn parent_of(&self, index: usize) -> Option<&str> {
        if index == 0 || index >= self.layers.len() {
            return None;
        }
        Some(&self.layers[index - 1])
    }

    /// base → tip 순서로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(String::as_str)
    }

    /// 레이어 슬라이스
    pub fn as_slice(&self) -> &[String] {
        &self.layers
    }
}
