//! Token endpoint definitions and the HTTP [`TokenEndpoint`] implementation.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use tether_core::error::{AuthError, ProtocolError};
use tether_core::{AccessToken, CredentialPair, Credentials, RefreshToken, Result, TokenEndpoint};

use crate::request::ApiRequest;
use crate::transport::Transport;

// ============================================================================
// Endpoint Paths
// ============================================================================

/// Token issuance: `{username, password}` → `{access, refresh}`.
pub const TOKEN_OBTAIN: &str = "token/";

/// Token refresh: `{refresh}` → `{access}`.
pub const TOKEN_REFRESH: &str = "token/refresh/";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for token issuance.
#[derive(Debug, Serialize)]
struct ObtainRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Response from token issuance.
#[derive(Debug, Deserialize)]
struct ObtainResponse {
    access: String,
    refresh: String,
}

/// Request body for token refresh.
#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

/// Response from token refresh.
///
/// A rotated `refresh` token, if the server sends one, is ignored.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Token endpoints reached over a [`Transport`].
///
/// Requests go straight to the transport and never through the middleware
/// chain, so a rejected login can't trigger a refresh.
#[derive(Clone)]
pub struct HttpTokenEndpoint {
    transport: Arc<dyn Transport>,
}

impl HttpTokenEndpoint {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
    #[instrument(skip(self, credentials), fields(username = %credentials.username()))]
    async fn obtain(&self, credentials: &Credentials) -> Result<CredentialPair> {
        debug!("Requesting token pair");

        let request = ApiRequest::post(TOKEN_OBTAIN).json(&ObtainRequest {
            username: credentials.username(),
            password: credentials.password(),
        })?;
        let response = self.transport.send(&request).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AuthError::InvalidCredentials.into());
        }

        let body: ObtainResponse = response.error_for_status()?.json()?;
        if body.access.is_empty() || body.refresh.is_empty() {
            return Err(ProtocolError::new(200, Some("token response is missing a token".into())).into());
        }

        Ok(CredentialPair::new(
            AccessToken::new(body.access),
            RefreshToken::new(body.refresh),
        ))
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<AccessToken> {
        debug!("Requesting new access token");

        let request = ApiRequest::post(TOKEN_REFRESH).json(&RefreshRequest {
            refresh: refresh_token.as_str(),
        })?;
        let response = self.transport.send(&request).await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthError::RefreshRejected {
                status: status.as_u16(),
            }
            .into());
        }

        let body: RefreshResponse = response.error_for_status()?.json()?;
        if body.access.is_empty() {
            return Err(
                ProtocolError::new(200, Some("refresh response is missing a token".into())).into(),
            );
        }

        Ok(AccessToken::new(body.access))
    }
}

impl std::fmt::Debug for HttpTokenEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTokenEndpoint").finish_non_exhaustive()
    }
}
