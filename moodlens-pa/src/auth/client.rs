//! Authenticated request execution with expiry recovery
//!
//! Wraps reqwest so callers never handle bearer tokens or 401s themselves.
//! A logical call makes at most two attempts: the original request and, after
//! a 401 followed by a successful refresh, exactly one reissue. The reissue's
//! outcome is final whatever its status.

use crate::auth::session::{AuthError, AuthSession};
use std::sync::Arc;

/// HTTP client bound to one platform's AuthSession
#[derive(Clone)]
pub struct AuthenticatedClient {
    session: Arc<AuthSession>,
    http: reqwest::Client,
}

impl AuthenticatedClient {
    pub fn new(session: Arc<AuthSession>, http: reqwest::Client) -> Self {
        Self { session, http }
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    /// GET with automatic bearer attachment and one-shot expiry recovery
    pub async fn get(&self, url: &str) -> Result<reqwest::Response, AuthError> {
        self.execute(|http| http.get(url)).await
    }

    /// Run one logical call: attach the current token, send, and on a 401
    /// refresh once and reissue once.
    async fn execute<F>(&self, build: F) -> Result<reqwest::Response, AuthError>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let token = self
            .session
            .access_token()
            .await?
            .ok_or(AuthError::NotConnected)?;

        let response = build(&self.http)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if response.status() != reqwest::StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!(
            platform = %self.session.platform(),
            "Request returned 401, attempting token refresh"
        );

        let fresh = match self.session.refresh_after_expiry(&token).await {
            Ok(fresh) => fresh,
            Err(err) => {
                // Refresh failed; the session has already disconnected.
                // Surface the original expiry to the caller.
                tracing::warn!(
                    platform = %self.session.platform(),
                    error = %err,
                    "Token refresh failed after 401"
                );
                return Ok(response);
            }
        };

        // Single reissue; its outcome is final.
        build(&self.http)
            .bearer_auth(&fresh)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))
    }
}
