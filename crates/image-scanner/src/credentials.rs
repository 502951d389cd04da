//! Registry credential source.
//!
//! Clair pulls each layer blob straight from the registry, so the scanner
//! forwards an `Authorization` header value with every layer submission. The
//! [`CredentialProvider`] trait decouples where that value comes from.

/// Supplies the registry `Authorization` header value, if any.
pub trait CredentialProvider: Send + Sync {
    /// Returns the full header value (e.g. `Bearer abc`), or `None` for
    /// anonymous access.
    fn authorization_header(&self) -> Option<String>;
}

/// A fixed bearer token from configuration.
#[derive(Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    /// Creates a provider; an empty token means anonymous.
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Anonymous access.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl CredentialProvider for StaticCredentials {
    fn authorization_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t.trim()))
    }
}

// keep the token out of debug logs
impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}
