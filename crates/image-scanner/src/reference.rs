//! Image reference parsing.
//!
//! Turns user input such as `nginx`, `myorg/app:1.2`, `host:5000/team/app:1.0`
//! or `app@sha256:...` into an [`ImageReference`]. Parsing is pure: no network
//! or filesystem access.
//!
//! # Tag vs. port
//!
//! A naive split on the last `:` would read `host:5000/image` as the image
//! `host` with tag `5000/image`. A `:` only separates a tag when no `/`
//! follows it, so a port-bearing registry host is never mistaken for a tag.
//!
//! # Registry host
//!
//! When the first path segment contains `.` or `:` or is `localhost`, it names
//! the registry and is removed from the repository name. The remaining name
//! receives the `library/` namespace when it has a single segment and
//! namespace defaulting is enabled.

use std::fmt;

use serde::Serialize;

use crate::error::ImageScanError;

/// Tag used when the input carries none.
pub const DEFAULT_TAG: &str = "latest";

/// Namespace prepended to single-segment names.
pub const DEFAULT_NAMESPACE: &str = "library";

const MAX_TAG_LEN: usize = 128;

/// A resolved image reference.
///
/// `name` is the repository path inside the registry (always namespaced unless
/// defaulting was suppressed), `tag` is a tag or a `algorithm:hex` digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageReference {
    registry_host: Option<String>,
    registry_port: Option<u16>,
    name: String,
    tag: String,
}

impl ImageReference {
    /// Parses `input`, applying the default tag and, if `namespace_defaulting`
    /// is set, the default `library` namespace.
    ///
    /// # Errors
    ///
    /// Returns [`ImageScanError::ImageResolution`] for empty input, empty path
    /// segments, invalid name or tag characters, or a malformed registry port.
    pub fn parse(input: &str, namespace_defaulting: bool) -> Result<Self, ImageScanError> {
        let fail = |reason: &str| ImageScanError::ImageResolution {
            input: input.to_owned(),
            reason: reason.to_owned(),
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(fail("reference is empty"));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(fail("reference must not contain whitespace"));
        }

        // digest wins over any tag that precedes it
        let (remainder, digest) = match trimmed.split_once('@') {
            Some((rest, digest)) => {
                if !is_valid_digest(digest) {
                    return Err(fail("digest must look like 'algorithm:hex'"));
                }
                (rest, Some(digest))
            }
            None => (trimmed, None),
        };

        let (path, tag) = split_tag(remainder);
        let tag = match (digest, tag) {
            (Some(digest), _) => digest.to_owned(),
            (None, Some(tag)) => {
                if !is_valid_tag(tag) {
                    return Err(fail(
                        "tag must be 1-128 characters of [A-Za-z0-9_.-] and not start with '.' or '-'",
                    ));
                }
                tag.to_owned()
            }
            (None, None) => DEFAULT_TAG.to_owned(),
        };

        let (registry, repository) = split_registry(path);
        let (registry_host, registry_port) = match registry {
            Some(registry) => {
                let (host, port) = parse_host_port(registry).ok_or_else(|| {
                    fail("registry port must be a number between 1 and 65535")
                })?;
                (Some(host.to_owned()), port)
            }
            None => (None, None),
        };

        let segments: Vec<&str> = repository.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(fail("repository name has an empty path segment"));
        }
        if let Some(bad) = segments.iter().find(|s| !is_valid_component(s)) {
            return Err(fail(&format!(
                "path segment '{bad}' must be lowercase alphanumerics separated by '.', '_' or '-'"
            )));
        }

        let name = if segments.len() == 1 && namespace_defaulting {
            format!("{DEFAULT_NAMESPACE}/{repository}")
        } else {
            repository.to_owned()
        };

        Ok(Self {
            registry_host,
            registry_port,
            name,
            tag,
        })
    }

    /// Repository path inside the registry, e.g. `library/nginx`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag or digest, e.g. `latest` or `sha256:...`.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Registry host named in the reference, if any.
    pub fn registry_host(&self) -> Option<&str> {
        self.registry_host.as_deref()
    }

    /// Registry port named in the reference, if any.
    pub fn registry_port(&self) -> Option<u16> {
        self.registry_port
    }

    /// Whether the reference pins a digest instead of a tag.
    pub fn is_digest(&self) -> bool {
        self.tag.contains(':')
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(host) = &self.registry_host {
            match self.registry_port {
                Some(port) => write!(f, "{host}:{port}/")?,
                None => write!(f, "{host}/")?,
            }
        }
        let sep = if self.is_digest() { '@' } else { ':' };
        write!(f, "{}{}{}", self.name, sep, self.tag)
    }
}

/// Splits `name[:tag]`. A `:` followed later by `/` belongs to a host port.
fn split_tag(s: &str) -> (&str, Option<&str>) {
    match s.rsplit_once(':') {
        Some((path, tag)) if !tag.contains('/') => (path, Some(tag)),
        _ => (s, None),
    }
}

fn split_registry(path: &str) -> (Option<&str>, &str) {
    match path.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            (Some(first), rest)
        }
        _ => (None, path),
    }
}

fn parse_host_port(registry: &str) -> Option<(&str, Option<u16>)> {
    match registry.split_once(':') {
        Some((host, port)) => {
            let port: u16 = port.parse().ok()?;
            if host.is_empty() || port == 0 {
                return None;
            }
            Some((host, Some(port)))
        }
        None => Some((registry, None)),
    }
}

fn is_valid_component(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    let edge_ok = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    match (bytes.first(), bytes.last()) {
        (Some(&first), Some(&last)) if edge_ok(first) && edge_ok(last) => bytes
            .iter()
            .all(|&b| edge_ok(b) || b == b'.' || b == b'_' || b == b'-'),
        _ => false,
    }
}

fn is_valid_tag(tag: &str) -> bool {
    if tag.is_empty() || tag.len() > MAX_TAG_LEN || tag.starts_with(['.', '-']) {
        return false;
    }
    tag.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
}

fn is_valid_digest(digest: &str) -> bool {
    match digest.split_once(':') {
        Some((algorithm, hex)) => {
            !algorithm.is_empty()
                && algorithm
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                && hex.len() >= 32
                && hex.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}
