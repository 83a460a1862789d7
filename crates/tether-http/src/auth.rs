//! Bearer header attachment.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use tether_core::{Result, TokenStore};

use crate::middleware::{Middleware, Next};
use crate::request::{ApiRequest, ApiResponse};

/// Attaches the stored access token to every request.
///
/// Reads the token store on every call and never decodes or validates the
/// token; a stale token is discovered by the server's 401. With no stored
/// pair the request goes out as the caller built it.
pub struct BearerAuth {
    store: Arc<dyn TokenStore>,
}

impl BearerAuth {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Middleware for BearerAuth {
    async fn handle(&self, request: &mut ApiRequest, next: Next<'_>) -> Result<ApiResponse> {
        match self.store.read()? {
            Some(stored) => {
                trace!(tier = %stored.tier, "Attaching bearer token");
                request.set_bearer(&stored.pair.access)?;
            }
            None => trace!("No stored token, sending unauthenticated"),
        }
        next.run(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Transport;
    use reqwest::StatusCode;
    use reqwest::header::HeaderMap;
    use tether_core::{AccessToken, CredentialPair, RefreshToken, StorageTier};
    use tether_store::TieredStore;

    /// Responds with the bearer token it received.
    struct BearerEcho;

    #[async_trait]
    impl Transport for BearerEcho {
        async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
            let body = request.bearer_token().unwrap_or("<none>").to_string();
            Ok(ApiResponse::new(StatusCode::OK, HeaderMap::new(), body.into_bytes()))
        }
    }

    async fn send_through(store: Arc<dyn TokenStore>) -> String {
        let chain: Vec<Arc<dyn Middleware>> = vec![Arc::new(BearerAuth::new(store))];
        let mut request = ApiRequest::get("requests/");
        Next::new(&chain, &BearerEcho)
            .run(&mut request)
            .await
            .unwrap()
            .text()
    }

    #[tokio::test]
    async fn attaches_stored_access_token() {
        let store = Arc::new(TieredStore::in_memory());
        store
            .write(
                &CredentialPair::new(AccessToken::new("tok-1"), RefreshToken::new("r")),
                StorageTier::Ephemeral,
            )
            .unwrap();

        assert_eq!(send_through(store).await, "tok-1");
    }

    #[tokio::test]
    async fn empty_store_sends_unauthenticated() {
        let store = Arc::new(TieredStore::in_memory());
        assert_eq!(send_through(store).await, "<none>");
    }

    #[tokio::test]
    async fn persistent_token_wins() {
        let store = Arc::new(TieredStore::in_memory());
        store
            .write(
                &CredentialPair::new(AccessToken::new("eph"), RefreshToken::new("r")),
                StorageTier::Ephemeral,
            )
            .unwrap();
        store
            .write(
                &CredentialPair::new(AccessToken::new("per"), RefreshToken::new("r")),
                StorageTier::Persistent,
            )
            .unwrap();

        assert_eq!(send_through(store).await, "per");
    }
}
