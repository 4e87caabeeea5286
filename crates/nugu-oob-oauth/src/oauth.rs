//! OAuth 2.0 calls against the NUGU identity provider.

use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use reqwest::StatusCode;

use crate::error::{OAuthError, Result};
use crate::types::{Registration, TokenRecord};

/// Default identity provider base URL.
pub const DEFAULT_OAUTH2_URL: &str = "https://api.sktnugu.com";

/// Default redirect URI registered for the helper.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/callback";

/// Default timeout for provider requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider endpoints and client-side settings.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub base_url: String,
    pub authorize_path: String,
    pub token_path: String,
    pub revoke_path: String,
    pub redirect_uri: String,
    pub timeout: Duration,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self::nugu(DEFAULT_OAUTH2_URL)
    }
}

impl OAuthConfig {
    /// NUGU endpoint layout under the given base URL.
    pub fn nugu(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            authorize_path: "/v1/auth/oauth/authorize".to_string(),
            token_path: "/v1/auth/oauth/token".to_string(),
            revoke_path: "/v1/auth/oauth/revoke".to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn authorize_url(&self) -> String {
        self.endpoint(&self.authorize_path)
    }

    pub fn token_url(&self) -> String {
        self.endpoint(&self.token_path)
    }

    pub fn revoke_url(&self) -> String {
        self.endpoint(&self.revoke_path)
    }
}

/// Generate a random state string for CSRF protection.
pub fn generate_state() -> String {
    let mut state_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut state_bytes);
    URL_SAFE_NO_PAD.encode(state_bytes)
}

/// Build the authorization URL the user-agent is redirected to.
pub fn build_authorization_url(
    config: &OAuthConfig,
    registration: &Registration,
    state: &str,
) -> String {
    let data = registration.device_data();
    let params = [
        ("response_type", "code"),
        ("client_id", registration.client_id.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("state", state),
        ("data", data.as_str()),
    ];

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", config.authorize_url(), query)
}

/// Pull a human-readable message out of a provider error body.
fn provider_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error_description", "error"] {
            if let Some(msg) = json.get(key).and_then(|v| v.as_str())
                && !msg.is_empty()
            {
                return msg.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Unknown error".to_string()
    } else {
        trimmed.to_string()
    }
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Client for the provider's token and revoke endpoints.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    config: OAuthConfig,
}

impl OAuthClient {
    /// Create a client with its own connection pool.
    pub fn new(config: OAuthConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OAuthError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Authorization URL for the given registration and CSRF state.
    pub fn authorization_url(&self, registration: &Registration, state: &str) -> String {
        build_authorization_url(&self.config, registration, state)
    }

    /// Exchange an authorization code for a token.
    pub async fn exchange_code(
        &self,
        registration: &Registration,
        code: &str,
    ) -> Result<TokenRecord> {
        let data = registration.device_data();
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", registration.client_id.as_str()),
            ("client_secret", registration.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("data", data.as_str()),
        ];

        let mut token = self.post_token_form("Token exchange", &params).await?;
        token.stamp_expiry(now_secs());
        Ok(token)
    }

    /// Run the client-credentials grant. The response is returned as sent.
    pub async fn client_credentials(&self, registration: &Registration) -> Result<TokenRecord> {
        let data = registration.device_data();
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", registration.client_id.as_str()),
            ("client_secret", registration.client_secret.as_str()),
            ("data", data.as_str()),
        ];

        self.post_token_form("Client credentials", &params).await
    }

    /// Exchange a refresh token for a new token.
    pub async fn refresh(
        &self,
        registration: &Registration,
        refresh_token: &str,
    ) -> Result<TokenRecord> {
        let data = registration.device_data();
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", registration.client_id.as_str()),
            ("client_secret", registration.client_secret.as_str()),
            ("data", data.as_str()),
        ];

        let mut token = self.post_token_form("Token refresh", &params).await?;
        token.stamp_expiry(now_secs());
        Ok(token)
    }

    /// Revoke an access token.
    pub async fn revoke(&self, registration: &Registration, token: &str) -> Result<()> {
        let params = [
            ("token", token),
            ("token_type_hint", "access_token"),
            ("client_id", registration.client_id.as_str()),
            ("client_secret", registration.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(self.config.revoke_url())
            .form(&params)
            .send()
            .await
            .map_err(|e| OAuthError::Network(format!("Revoke request failed: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Provider {
                status: status.as_u16(),
                message: provider_message(&body),
            });
        }

        tracing::info!("Token revoked");
        Ok(())
    }

    async fn post_token_form(&self, action: &str, params: &[(&str, &str)]) -> Result<TokenRecord> {
        let grant_type = params
            .iter()
            .find(|(k, _)| *k == "grant_type")
            .map(|(_, v)| *v)
            .unwrap_or_default();
        tracing::debug!(grant_type, url = %self.config.token_url(), "Requesting token");

        let response = self
            .http
            .post(self.config.token_url())
            .form(params)
            .send()
            .await
            .map_err(|e| OAuthError::Network(format!("{} request failed: {}", action, e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let message = provider_message(&body);
            tracing::warn!(grant_type, status = status.as_u16(), %message, "{} failed", action);
            return Err(OAuthError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| OAuthError::Network(format!("{} response unreadable: {}", action, e)))?;

        let token = TokenRecord::from_json(&body).map_err(|e| {
            OAuthError::Serialization(format!("Failed to parse {} response: {}", action, e))
        })?;

        if token.access_token().is_none() {
            return Err(OAuthError::Serialization(format!(
                "{} response has no access_token",
                action
            )));
        }

        tracing::info!(grant_type, "Token issued");
        Ok(token)
    }
}
