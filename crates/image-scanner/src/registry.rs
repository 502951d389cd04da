//! Registry API abstraction.
//!
//! The [`RegistryClient`] trait hides the Docker distribution HTTP API so the
//! scan flow can run against [`HttpRegistryClient`] in production and a
//! recording mock in tests.
//!
//! # Status mapping
//!
//! - **2xx**: body decoded as a [`Manifest`]; an undecodable body is a
//!   `RegistryTransport` error carrying the URL
//! - **404**: `RegistryNotFound`, kept distinct from transport failures
//! - **anything else** (other statuses, connect/TLS failures, timeouts):
//!   `RegistryTransport` with URL and status when one was received
//!
//! A failed fetch never turns into an empty manifest.

use std::future::Future;
use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use tracing::instrument;

use yair_core::metrics as m;

use crate::credentials::CredentialProvider;
use crate::error::ImageScanError;
use crate::http;
use crate::manifest::{MEDIA_TYPE_DOCKER_V1_SIGNED, MEDIA_TYPE_DOCKER_V2, Manifest};
use crate::reference::ImageReference;
use crate::settings::RegistrySettings;

/// A manifest together with the URL it was fetched from.
///
/// The URL is kept because layer blob locations are derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedManifest {
    /// `{protocol}://{host}:{port}/v2/{name}/manifests/{tag}`
    pub url: String,
    /// Decoded body
    pub manifest: Manifest,
}

/// Trait abstracting registry manifest retrieval.
pub trait RegistryClient: Send + Sync {
    /// Fetches the manifest for `reference`.
    ///
    /// # Errors
    ///
    /// - `ImageScanError::RegistryNotFound`: the registry answered 404
    /// - `ImageScanError::RegistryTransport`: any other failure
    fn fetch_manifest(
        &self,
        reference: &ImageReference,
    ) -> impl Future<Output = Result<FetchedManifest, ImageScanError>> + Send;
}

/// Derives the blob URL of `digest` from a manifest URL by replacing the
/// trailing `/manifests/{tag}` with `/blobs/{digest}`.
pub fn blob_url(manifest_url: &str, digest: &str) -> String {
    match manifest_url.rsplit_once("/manifests/") {
        Some((repository, _)) => format!("{repository}/blobs/{digest}"),
        None => format!("{}/blobs/{digest}", manifest_url.trim_end_matches('/')),
    }
}

/// Production registry client backed by `reqwest`.
///
/// Sends the v2 manifest media type first and the signed v1 type as a
/// lower-priority alternative, so registries that only serve v1 still answer.
pub struct HttpRegistryClient {
    client: reqwest::Client,
    settings: RegistrySettings,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpRegistryClient {
    /// Builds a client with the timeout and TLS policy from `settings`.
    ///
    /// # Errors
    ///
    /// Returns `ImageScanError::ClientBuild` if the TLS backend cannot be
    /// initialised.
    pub fn new(
        settings: RegistrySettings,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ImageScanError> {
        let client = http::build_client(settings.timeout, settings.ssl_verify)?;
        Ok(Self {
            client,
            settings,
            credentials,
        })
    }

    fn accept_header() -> String {
        format!("{MEDIA_TYPE_DOCKER_V2}, {MEDIA_TYPE_DOCKER_V1_SIGNED};q=0.5")
    }
}

impl RegistryClient for HttpRegistryClient {
    #[instrument(skip(self, reference), fields(image = %reference))]
    async fn fetch_manifest(
        &self,
        reference: &ImageReference,
    ) -> Result<FetchedManifest, ImageScanError> {
        let url = self.settings.manifest_url(reference);
        let auth = self.credentials.authorization_header();

        let result = fetch(&self.client, &url, auth.as_deref()).await;
        let label = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!(m::REGISTRY_MANIFEST_REQUESTS_TOTAL, m::LABEL_RESULT => label)
            .increment(1);

        let manifest = result?;
        tracing::info!(
            url = %url,
            schema_version = manifest.schema_version,
            "manifest fetched"
        );
        Ok(FetchedManifest { url, manifest })
    }
}

async fn fetch(
    client: &reqwest::Client,
    url: &str,
    auth: Option<&str>,
) -> Result<Manifest, ImageScanError> {
    let transport = |status: Option<u16>, reason: String| ImageScanError::RegistryTransport {
        url: url.to_owned(),
        status,
        reason,
    };

    let response = http::send_idempotent(|| {
        let request = client
            .get(url)
            .header(ACCEPT, HttpRegistryClient::accept_header());
        match auth {
            Some(value) => request.header(AUTHORIZATION, value),
            None => request,
        }
    })
    .await
    .map_err(|e| transport(None, http::describe(&e)))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ImageScanError::RegistryNotFound {
            url: url.to_owned(),
        });
    }
    if !status.is_success() {
        let reason = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                format!("status {status} (check registry.token)")
            }
            _ => format!("unexpected status {status}"),
        };
        return Err(transport(Some(status.as_u16()), reason));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| transport(Some(status.as_u16()), http::describe(&e)))?;
    Manifest::from_slice(&body)
        .map_err(|e| transport(Some(status.as_u16()), format!("invalid manifest body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_url_replaces_manifest_suffix() {
        assert_eq!(
            blob_url(
                "https://registry.local:443/v2/library/nginx/manifests/latest",
                "sha256:abc"
            ),
            "https://registry.local:443/v2/library/nginx/blobs/sha256:abc"
        );
    }

    #[test]
    fn blob_url_with_digest_reference() {
        assert_eq!(
            blob_url(
                "http://r:5000/v2/team/app/manifests/sha256:feed",
                "sha256:layer"
            ),
            "http://r:5000/v2/team/app/blobs/sha256:layer"
        );
    }

    #[test]
    fn blob_url_uses_last_manifest_segment() {
        assert_eq!(
            blob_url("http://r:80/v2/manifests/app/manifests/1.0", "sha256:x"),
            "http://r:80/v2/manifests/app/blobs/sha256:x"
        );
    }

    #[test]
    fn accept_prefers_v2() {
        let accept = HttpRegistryClient::accept_header();
        assert!(accept.starts_with(MEDIA_TYPE_DOCKER_V2));
        assert!(accept.contains("v1+prettyjws;q=0.5"));
    }
}
