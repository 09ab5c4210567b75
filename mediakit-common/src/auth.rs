//! Credentials via Application Default Credentials.
//!
//! Wraps `gcp_auth` credential discovery: service-account files named by
//! `GOOGLE_APPLICATION_CREDENTIALS`, user credentials from `gcloud auth
//! application-default login`, the GCE metadata server, or the gcloud CLI.
//! Tokens are cached by the provider and refreshed on expiry.

use std::sync::Arc;

use gcp_auth::TokenProvider;
use tracing::debug;

use crate::error::AuthError;

enum TokenSource {
    Provider(Arc<dyn TokenProvider>),
    /// Fixed token for tests, never refreshed.
    Fixed(String),
}

/// Bearer-token source for Google Cloud API calls.
pub struct Credentials {
    source: TokenSource,
}

impl Credentials {
    /// Discover Application Default Credentials.
    ///
    /// # Errors
    /// Returns `AuthError::NotConfigured` when no credential source is found.
    pub async fn discover() -> Result<Self, AuthError> {
        let provider = gcp_auth::provider().await.map_err(|e| {
            debug!("ADC discovery failed: {}", e);
            AuthError::NotConfigured
        })?;

        Ok(Self {
            source: TokenSource::Provider(provider),
        })
    }

    /// Credentials that always hand out `token`. Intended for tests and for
    /// pointing handlers at mock endpoints.
    pub fn fixed(token: &str) -> Self {
        Self {
            source: TokenSource::Fixed(token.to_string()),
        }
    }

    /// Obtain a bearer token valid for the given OAuth scopes.
    ///
    /// # Errors
    /// Returns `AuthError::RefreshFailed` when the provider cannot mint a
    /// token.
    pub async fn bearer_token(&self, scopes: &[&str]) -> Result<String, AuthError> {
        match &self.source {
            TokenSource::Provider(provider) => {
                let token = provider
                    .token(scopes)
                    .await
                    .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;
                Ok(token.as_str().to_string())
            }
            TokenSource::Fixed(token) => Ok(token.clone()),
        }
    }
}

/// OAuth scopes used across the MediaKit servers.
pub mod scopes {
    /// Full access to Google Cloud Platform APIs.
    pub const CLOUD_PLATFORM: &str = "https://www.googleapis.com/auth/cloud-platform";

    /// Read/write access to Cloud Storage.
    pub const STORAGE_READ_WRITE: &str = "https://www.googleapis.com/auth/devstorage.read_write";

    /// Read-only access to Cloud Storage.
    pub const STORAGE_READ_ONLY: &str = "https://www.googleapis.com/auth/devstorage.read_only";
}
