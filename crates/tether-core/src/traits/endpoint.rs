//! Token endpoint trait.

use async_trait::async_trait;

use crate::{AccessToken, CredentialPair, Credentials, RefreshToken, Result};

/// The server's token issuance and refresh endpoints.
///
/// Implementations must map a rejected login to
/// [`AuthError::InvalidCredentials`](crate::error::AuthError::InvalidCredentials)
/// and a rejected refresh to
/// [`AuthError::RefreshRejected`](crate::error::AuthError::RefreshRejected),
/// keeping transport failures as [`Error::Transport`](crate::Error::Transport).
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange a username and password for a credential pair.
    async fn obtain(&self, credentials: &Credentials) -> Result<CredentialPair>;

    /// Exchange a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<AccessToken>;
}
