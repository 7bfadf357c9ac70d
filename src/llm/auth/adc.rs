//! Application Default Credentials (ADC) wrapper

use gcp_auth::AuthenticationManager as GcpAuthManager;
use tracing::debug;

use crate::llm::core::error::LlmError;

/// OAuth scope required by Vertex AI
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Manages GCP access tokens using Application Default Credentials
///
/// Credentials are discovered from `GOOGLE_APPLICATION_CREDENTIALS`, the gcloud
/// user credentials, or the metadata server. Tokens are cached and refreshed by
/// `gcp_auth`.
pub struct AuthenticationManager {
    inner: GcpAuthManager,
}

impl AuthenticationManager {
    /// Discover credentials using the standard ADC flow
    ///
    /// # Errors
    /// Returns an error if no valid credentials can be found.
    pub async fn new() -> Result<Self, LlmError> {
        let inner = GcpAuthManager::new().await.map_err(|e| {
            LlmError::AuthenticationError(format!("Failed to initialize ADC: {}", e))
        })?;

        debug!("Application Default Credentials initialized");
        Ok(Self { inner })
    }

    /// Get an access token for the cloud platform scope
    pub async fn get_token(&self) -> Result<String, LlmError> {
        let token = self
            .inner
            .get_token(&[CLOUD_PLATFORM_SCOPE])
            .await
            .map_err(|e| LlmError::AuthenticationError(format!("Failed to get token: {}", e)))?;

        Ok(token.as_str().to_string())
    }
}
