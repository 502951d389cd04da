//! Clair v1 API abstraction.
//!
//! [`ClairClient`] covers the three layer operations the scan flow needs:
//!
//! | Operation | Request | Failure handling |
//! |---|---|---|
//! | [`submit_layer`](ClairClient::submit_layer) | `POST /v1/layers` | error, never retried |
//! | [`delete_layer`](ClairClient::delete_layer) | `DELETE /v1/layers/{name}` | reported as [`CleanupOutcome`], never an error |
//! | [`layer_vulnerabilities`](ClairClient::layer_vulnerabilities) | `GET /v1/layers/{name}?features&vulnerabilities` | error |
//!
//! Wire payloads use Clair's PascalCase field names.

use std::collections::HashMap;
use std::future::Future;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use yair_core::types::{Severity, Vulnerability};

use crate::error::ImageScanError;
use crate::http;
use crate::settings::ClairSettings;

/// Layer format sent with every submission.
pub const LAYER_FORMAT: &str = "Docker";

const MAX_BODY_SNIPPET: usize = 200;

/// Per-layer indexing request.
///
/// Serialises as the inner object of `{"Layer": {...}}`. `ParentName` and
/// `Headers` are omitted for the base layer and for anonymous registries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanRequest {
    /// Layer digest, used as the Clair layer name
    pub name: String,
    /// Registry blob URL Clair downloads the layer from
    pub path: String,
    /// Headers Clair sends when downloading the blob
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<LayerHeaders>,
    /// Digest of the parent layer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    /// Always [`LAYER_FORMAT`]
    pub format: String,
}

/// Download headers forwarded to Clair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LayerHeaders {
    /// Registry `Authorization` value
    pub authorization: String,
}

impl ScanRequest {
    /// Builds the request for one layer.
    pub fn new(
        layer: &str,
        parent: Option<&str>,
        blob_path: String,
        authorization: Option<String>,
    ) -> Self {
        Self {
            name: layer.to_owned(),
            path: blob_path,
            headers: authorization.map(|authorization| LayerHeaders { authorization }),
            parent_name: parent.map(str::to_owned),
            format: LAYER_FORMAT.to_owned(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct LayerEnvelope<'a> {
    layer: &'a ScanRequest,
}

/// Result of a best-effort cleanup request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CleanupOutcome {
    /// A stale entry existed and was removed
    Deleted,
    /// The service had no entry for the layer (404)
    NothingToClean,
    /// The request failed; the scan continues
    Failed {
        /// Why the cleanup failed
        reason: String,
    },
}

impl CleanupOutcome {
    /// Metric label value.
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Deleted => "deleted",
            Self::NothingToClean => "nothing_to_clean",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Trait abstracting the vulnerability service.
pub trait ClairClient: Send + Sync {
    /// Submits one layer for indexing.
    ///
    /// # Errors
    ///
    /// Returns `ImageScanError::ClairTransport` on any non-2xx status or
    /// transport failure.
    fn submit_layer(
        &self,
        request: &ScanRequest,
    ) -> impl Future<Output = Result<(), ImageScanError>> + Send;

    /// Deletes a layer's index entry. Never fails the scan.
    fn delete_layer(&self, layer: &str) -> impl Future<Output = CleanupOutcome> + Send;

    /// Reads the vulnerability findings of an indexed layer, including its
    /// ancestors' features.
    ///
    /// # Errors
    ///
    /// Returns `ImageScanError::ClairTransport` on a non-2xx status, transport
    /// failure or undecodable body.
    fn layer_vulnerabilities(
        &self,
        layer: &str,
    ) -> impl Future<Output = Result<Vec<Vulnerability>, ImageScanError>> + Send;
}

/// Production client backed by `reqwest`.
pub struct HttpClairClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClairClient {
    /// Builds a client with the timeout and TLS policy from `settings`.
    ///
    /// # Errors
    ///
    /// Returns `ImageScanError::ClientBuild` if the TLS backend cannot be
    /// initialised.
    pub fn new(settings: &ClairSettings) -> Result<Self, ImageScanError> {
        let client = http::build_client(settings.timeout, settings.ssl_verify)?;
        Ok(Self {
            client,
            base_url: settings.base_url(),
        })
    }

    fn layers_url(&self) -> String {
        format!("{}/v1/layers", self.base_url)
    }

    fn layer_url(&self, layer: &str) -> String {
        format!("{}/v1/layers/{layer}", self.base_url)
    }
}

impl ClairClient for HttpClairClient {
    #[instrument(skip(self, request), fields(layer = %request.name))]
    async fn submit_layer(&self, request: &ScanRequest) -> Result<(), ImageScanError> {
        let url = self.layers_url();
        let response = self
            .client
            .post(&url)
            .json(&LayerEnvelope { layer: request })
            .send()
            .await
            .map_err(|e| clair_error(&url, None, http::describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(clair_error(
                &url,
                Some(status.as_u16()),
                status_reason(status, &body),
            ));
        }
        tracing::debug!(status = status.as_u16(), "layer accepted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_layer(&self, layer: &str) -> CleanupOutcome {
        let url = self.layer_url(layer);
        match http::send_idempotent(|| self.client.delete(&url)).await {
            Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                CleanupOutcome::NothingToClean
            }
            Ok(response) if response.status().is_success() => CleanupOutcome::Deleted,
            Ok(response) => CleanupOutcome::Failed {
                reason: format!("{url}: unexpected status {}", response.status()),
            },
            Err(e) => CleanupOutcome::Failed {
                reason: format!("{url}: {}", http::describe(&e)),
            },
        }
    }

    #[instrument(skip(self))]
    async fn layer_vulnerabilities(
        &self,
        layer: &str,
    ) -> Result<Vec<Vulnerability>, ImageScanError> {
        let url = format!("{}?features&vulnerabilities", self.layer_url(layer));
        let response = http::send_idempotent(|| self.client.get(&url))
            .await
            .map_err(|e| clair_error(&url, None, http::describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(clair_error(
                &url,
                Some(status.as_u16()),
                status_reason(status, &body),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| clair_error(&url, Some(status.as_u16()), http::describe(&e)))?;
        let report = parse_layer_report(&body).map_err(|e| {
            clair_error(
                &url,
                Some(status.as_u16()),
                format!("invalid layer report: {e}"),
            )
        })?;
        tracing::debug!(findings = report.len(), "layer report read");
        Ok(report)
    }
}

fn clair_error(url: &str, status: Option<u16>, reason: String) -> ImageScanError {
    ImageScanError::ClairTransport {
        url: url.to_owned(),
        status,
        reason,
    }
}

fn status_reason(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return format!("unexpected status {status}");
    }
    let snippet: String = body.chars().take(MAX_BODY_SNIPPET).collect();
    format!("unexpected status {status}: {snippet}")
}

// --- layer report wire types ---

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LayerReportEnvelope {
    layer: LayerReport,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LayerReport {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Feature {
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    vulnerabilities: Vec<FeatureVulnerability>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FeatureVulnerability {
    name: String,
    #[serde(default)]
    namespace_name: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    fixed_by: Option<String>,
    #[serde(default)]
    metadata: Option<HashMap<String, serde_json::Value>>,
}

impl FeatureVulnerability {
    /// NVD CVSSv3 score, else CVSSv2, clamped to 0-10.
    fn cvss_score(&self) -> Option<f64> {
        let nvd = self.metadata.as_ref()?.get("NVD")?;
        ["CVSSv3", "CVSSv2"]
            .iter()
            .find_map(|version| nvd.get(version)?.get("Score")?.as_f64())
            .filter(|score| score.is_finite())
            .map(|score| score.clamp(0.0, 10.0))
    }
}

/// Flattens a Clair layer report into findings, highest score first.
pub fn parse_layer_report(body: &[u8]) -> Result<Vec<Vulnerability>, serde_json::Error> {
    let envelope: LayerReportEnvelope = serde_json::from_slice(body)?;

    let mut findings: Vec<Vulnerability> = envelope
        .layer
        .features
        .into_iter()
        .flat_map(|feature| {
            let Feature {
                name: package,
                version,
                vulnerabilities,
            } = feature;
            vulnerabilities.into_iter().map(move |v| {
                let severity = Severity::from_str_loose(&v.severity);
                let score = v.cvss_score().unwrap_or_else(|| severity.default_score());
                Vulnerability {
                    id: v.name,
                    namespace: v.namespace_name,
                    package: package.clone(),
                    version: version.clone(),
                    fixed_by: v.fixed_by.filter(|f| !f.is_empty()),
                    severity,
                    score,
                    link: v.link.filter(|l| !l.is_empty()),
                }
            })
        })
        .collect();

    findings.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.id.cmp(&b.id))
            .then_with(|| a.package.cmp(&b.package))
    });
    Ok(findings)
}
