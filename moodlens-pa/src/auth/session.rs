//! OAuth session lifecycle for one platform
//!
//! Drives the authorize/callback exchange and the refresh protocol, and owns
//! the platform's CredentialStore. The session is the only writer of
//! credential state; all refreshes are serialized through a single in-flight
//! guard so overlapping 401 recoveries cannot race to overwrite a freshly
//! rotated token with a stale one.
//!
//! State machine: disconnected --(callback success)--> connected;
//! connected --(refresh success)--> connected;
//! connected --(refresh failure)--> disconnected.

use crate::auth::token_store::{CredentialStore, TokenPair};
use crate::config::OAuthAppConfig;
use crate::models::PlatformUser;
use crate::platform::{scopes, PlatformEndpoints};
use base64::Engine;
use moodlens_common::Platform;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential pair is stored for this platform
    #[error("Platform not connected")]
    NotConnected,

    /// Authorization is unrecoverable; credential state has been cleared and
    /// the user must re-authorize from scratch
    #[error("Authorization failed: {0}")]
    Failed(String),

    /// Transport-level failure talking to the platform
    #[error("Network error: {0}")]
    Network(String),

    /// Unexpected token endpoint payload
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Token endpoint response (code exchange and refresh share the shape)
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
}

/// OAuth session for one platform
pub struct AuthSession {
    platform: Platform,
    endpoints: PlatformEndpoints,
    app: OAuthAppConfig,
    store: CredentialStore,
    http: reqwest::Client,
    /// Serializes refresh attempts; held across the whole refresh round trip
    refresh_guard: Mutex<()>,
    /// PlatformUser cache, one fetch per valid token pair
    user: RwLock<Option<PlatformUser>>,
}

impl AuthSession {
    pub fn new(
        platform: Platform,
        endpoints: PlatformEndpoints,
        app: OAuthAppConfig,
        store: CredentialStore,
        http: reqwest::Client,
    ) -> Self {
        Self {
            platform,
            endpoints,
            app,
            store,
            http,
            refresh_guard: Mutex::new(()),
            user: RwLock::new(None),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Build the platform authorization URL the user's browser is sent to
    pub fn authorization_url(&self) -> Result<String, AuthError> {
        let params: Vec<(&str, &str)> = match self.platform {
            Platform::Spotify => vec![
                ("client_id", self.app.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.app.redirect_uri.as_str()),
                ("scope", scopes(self.platform)),
                ("show_dialog", "true"),
            ],
            Platform::Youtube => vec![
                ("client_id", self.app.client_id.as_str()),
                ("redirect_uri", self.app.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scopes(self.platform)),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        };

        let url = reqwest::Url::parse_with_params(&self.endpoints.authorize_url, &params)
            .map_err(|e| AuthError::Parse(format!("Authorize URL build failed: {}", e)))?;
        Ok(url.to_string())
    }

    /// Consume the provider's callback query parameters
    ///
    /// On a `code`, exchanges it at the token endpoint and stores the
    /// resulting pair. On an `error` parameter (or a failed exchange),
    /// reports failure without touching stored state; no panic escapes.
    pub async fn consume_callback(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<(), AuthError> {
        if let Some(error) = params.get("error") {
            tracing::warn!(platform = %self.platform, error = %error, "OAuth callback returned error");
            return Err(AuthError::Failed(error.clone()));
        }

        let code = params
            .get("code")
            .ok_or_else(|| AuthError::Failed("no_code".to_string()))?;

        let request = match self.platform {
            Platform::Spotify => {
                // Spotify authenticates the app via a Basic header
                let form = [
                    ("grant_type", "authorization_code"),
                    ("code", code.as_str()),
                    ("redirect_uri", self.app.redirect_uri.as_str()),
                ];
                self.http
                    .post(&self.endpoints.token_url)
                    .header("Authorization", self.basic_auth_header())
                    .form(&form)
            }
            Platform::Youtube => {
                // Google takes app credentials in the form body
                let form = [
                    ("client_id", self.app.client_id.as_str()),
                    ("client_secret", self.app.client_secret.as_str()),
                    ("code", code.as_str()),
                    ("grant_type", "authorization_code"),
                    ("redirect_uri", self.app.redirect_uri.as_str()),
                ];
                self.http.post(&self.endpoints.token_url).form(&form)
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            tracing::warn!(
                platform = %self.platform,
                status = status,
                "Token exchange failed"
            );
            return Err(AuthError::Failed(format!("token_exchange_failed ({})", status)));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Parse(e.to_string()))?;

        self.store
            .put(&TokenPair {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            })
            .await
            .map_err(|e| AuthError::Failed(e.to_string()))?;

        tracing::info!(platform = %self.platform, "OAuth exchange complete, platform connected");
        Ok(())
    }

    /// Current access token, if connected
    pub async fn access_token(&self) -> Result<Option<String>, AuthError> {
        let pair = self
            .store
            .get()
            .await
            .map_err(|e| AuthError::Failed(e.to_string()))?;
        Ok(pair.map(|p| p.access_token))
    }

    pub async fn is_connected(&self) -> bool {
        matches!(self.access_token().await, Ok(Some(_)))
    }

    /// Refresh the access token
    ///
    /// With no stored refresh token this disconnects immediately. A refresh
    /// endpoint failure also disconnects; the user must re-authorize.
    /// Returns the fresh access token on success.
    pub async fn refresh(&self) -> Result<String, AuthError> {
        let _guard = self.refresh_guard.lock().await;
        self.refresh_locked().await
    }

    /// Refresh after observing a 401 with the given (now stale) token
    ///
    /// Callers that blocked on the guard while another refresh was in flight
    /// re-read the store and skip the network round trip when the token has
    /// already rotated.
    pub async fn refresh_after_expiry(&self, stale_token: &str) -> Result<String, AuthError> {
        let _guard = self.refresh_guard.lock().await;

        if let Ok(Some(pair)) = self.store.get().await {
            if pair.access_token != stale_token {
                tracing::debug!(
                    platform = %self.platform,
                    "Token already rotated by a concurrent refresh"
                );
                return Ok(pair.access_token);
            }
        }

        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<String, AuthError> {
        let pair = self
            .store
            .get()
            .await
            .map_err(|e| AuthError::Failed(e.to_string()))?;

        let refresh_token = match pair.and_then(|p| p.refresh_token) {
            Some(token) => token,
            None => {
                tracing::warn!(platform = %self.platform, "No refresh token stored, disconnecting");
                self.disconnect().await;
                return Err(AuthError::Failed("no_refresh_token".to_string()));
            }
        };

        let request = match self.platform {
            Platform::Spotify => {
                let form = [
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token.as_str()),
                ];
                self.http
                    .post(&self.endpoints.token_url)
                    .header("Authorization", self.basic_auth_header())
                    .form(&form)
            }
            Platform::Youtube => {
                let form = [
                    ("client_id", self.app.client_id.as_str()),
                    ("client_secret", self.app.client_secret.as_str()),
                    ("refresh_token", refresh_token.as_str()),
                    ("grant_type", "refresh_token"),
                ];
                self.http.post(&self.endpoints.token_url).form(&form)
            }
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(platform = %self.platform, error = %e, "Refresh request failed, disconnecting");
                self.disconnect().await;
                return Err(AuthError::Failed(e.to_string()));
            }
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            tracing::warn!(
                platform = %self.platform,
                status = status,
                "Refresh rejected, disconnecting"
            );
            self.disconnect().await;
            return Err(AuthError::Failed(format!("refresh_failed ({})", status)));
        }

        let tokens: TokenResponse = match response.json().await {
            Ok(tokens) => tokens,
            Err(e) => {
                self.disconnect().await;
                return Err(AuthError::Failed(format!("refresh_parse_failed: {}", e)));
            }
        };

        // Keep the previous refresh token unless the platform rotated it
        let new_pair = TokenPair {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.or(Some(refresh_token)),
        };
        self.store
            .put(&new_pair)
            .await
            .map_err(|e| AuthError::Failed(e.to_string()))?;

        tracing::info!(platform = %self.platform, "Access token refreshed");
        Ok(tokens.access_token)
    }

    /// Clear credential state and the cached user; idempotent
    pub async fn disconnect(&self) {
        if let Err(e) = self.store.clear().await {
            tracing::error!(platform = %self.platform, error = %e, "Failed to clear credential store");
        }
        *self.user.write().await = None;
        tracing::info!(platform = %self.platform, "Platform disconnected");
    }

    /// Cached PlatformUser from a prior /me fetch
    pub async fn cached_user(&self) -> Option<PlatformUser> {
        self.user.read().await.clone()
    }

    pub async fn cache_user(&self, user: PlatformUser) {
        *self.user.write().await = Some(user);
    }

    fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.app.client_id, self.app.client_secret);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(raw)
        )
    }
}
