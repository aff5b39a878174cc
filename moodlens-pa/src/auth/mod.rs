//! Platform authentication
//!
//! Split into three layers: durable token storage (token_store), the OAuth
//! session driving exchange/refresh (session), and the authenticated HTTP
//! wrapper that recovers from token expiry (client).

pub mod client;
pub mod session;
pub mod token_store;

pub use client::AuthenticatedClient;
pub use session::{AuthError, AuthSession};
pub use token_store::{CredentialStore, TokenPair};

impl From<AuthError> for crate::error::ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotConnected => crate::error::ApiError::Unauthorized(err.to_string()),
            AuthError::Failed(_) => crate::error::ApiError::Unauthorized(err.to_string()),
            AuthError::Network(_) | AuthError::Parse(_) => {
                crate::error::ApiError::Upstream(err.to_string())
            }
        }
    }
}
