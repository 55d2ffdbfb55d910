//! HTTP client for the backend authentication endpoints.
//!
//! This module provides the `AuthClient` struct for obtaining and refreshing
//! bearer tokens. It knows exactly two endpoints: login and token refresh.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Login endpoint path, relative to the base URL.
const LOGIN_PATH: &str = "/auth/login/";

/// Token refresh endpoint path, relative to the base URL.
const REFRESH_PATH: &str = "/auth/token/refresh/";

/// Successful login payload.
///
/// The user profile is carried as opaque JSON - this crate never looks
/// inside it beyond persisting and handing it back to callers.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: serde_json::Value,
    #[serde(default)]
    pub access_expiration: Option<String>,
    #[serde(default)]
    pub refresh_expiration: Option<String>,
}

/// Successful refresh payload. Early backend revisions omit the expiration.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub access_expiration: Option<String>,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

/// Client for the authentication endpoints.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
}

impl AuthClient {
    /// Create a new client for the backend at `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit credentials to the login endpoint.
    ///
    /// On a non-2xx response the backend's error payload is passed through
    /// verbatim in `ApiError::CredentialsRejected`, so callers can surface
    /// field-level validation messages. Transport failures map to
    /// `ApiError::NetworkError`.
    pub async fn login<C: Serialize + ?Sized>(
        &self,
        credentials: &C,
    ) -> Result<LoginResponse, ApiError> {
        let url = format!("{}{}", self.base_url, LOGIN_PATH);

        let response = self.client.post(&url).json(credentials).send().await?;

        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| ApiError::InvalidResponse(format!("Bad login response: {}", e)))
        } else {
            let body = response.text().await.unwrap_or_default();
            debug!(status = %status, "Login rejected");
            // Keep whatever the backend sent; fall back to the raw text when
            // the error body is not JSON.
            let payload = serde_json::from_str(&body)
                .unwrap_or_else(|_| serde_json::Value::String(body));
            Err(ApiError::CredentialsRejected(payload))
        }
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
        let url = format!("{}{}", self.base_url, REFRESH_PATH);

        let response = self
            .client
            .post(&url)
            .json(&RefreshRequest {
                refresh: refresh_token,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| ApiError::InvalidResponse(format!("Bad refresh response: {}", e)))
        } else {
            let body = response.text().await.unwrap_or_default();
            debug!(status = %status, "Refresh rejected");
            Err(ApiError::from_status(status, &body))
        }
    }
}
