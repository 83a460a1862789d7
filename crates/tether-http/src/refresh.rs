//! Refresh-and-replay on authorization failure.
//!
//! Per request:
//!
//! ```text
//! Sent ──401──▶ Rejected ──already retried──────────────▶ Failed
//!                  │
//!                  ▼
//!             Refreshing ──no refresh token / rejected──▶ Failed
//!                  │
//!                  ▼
//!             Refreshed ──replay once──▶ outcome (a second 401 ▶ Failed)
//! ```
//!
//! Failed clears both storage tiers, forces the session to logged-out and
//! returns [`AuthError::SessionExpired`]. Transport errors during refresh are
//! returned unchanged and leave the session alone.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use tether_core::error::AuthError;
use tether_core::{AccessToken, Error, Result, SessionContext, TokenEndpoint};

use crate::middleware::{Middleware, Next};
use crate::request::{ApiRequest, ApiResponse};

/// How concurrent 401s share refresh exchanges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Every rejected request runs its own refresh exchange.
    Independent,
    /// Refreshes are serialized; a request rejected with a token that has
    /// since been replaced replays with the new token without refreshing.
    #[default]
    SingleFlight,
}

/// Middleware that recovers from 401 responses with one refresh and one replay.
pub struct RefreshCoordinator {
    session: SessionContext,
    endpoint: Arc<dyn TokenEndpoint>,
    policy: RefreshPolicy,
    gate: Mutex<()>,
}

impl RefreshCoordinator {
    pub fn new(
        session: SessionContext,
        endpoint: Arc<dyn TokenEndpoint>,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            session,
            endpoint,
            policy,
            gate: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// Run a refresh exchange now, outside of any request.
    ///
    /// A rejected or missing refresh token ends the session like it would for
    /// a rejected request.
    pub async fn refresh(&self) -> Result<()> {
        match self.renew(None).await {
            Err(e) if is_terminal(&e) => Err(self.fail(&e.to_string())),
            other => other,
        }
    }

    /// Obtain a new access token unless a concurrent request already did.
    async fn renew(&self, rejected: Option<&AccessToken>) -> Result<()> {
        match self.policy {
            RefreshPolicy::Independent => self.exchange().await,
            RefreshPolicy::SingleFlight => {
                let _permit = self.gate.lock().await;

                if let (Some(rejected), Some(stored)) = (rejected, self.session.store().read()?)
                    && stored.pair.access != *rejected
                {
                    debug!("Access token already renewed by a concurrent request");
                    return Ok(());
                }

                self.exchange().await
            }
        }
    }

    /// Exchange the stored refresh token and rewrite the access token in place.
    #[instrument(skip(self))]
    async fn exchange(&self) -> Result<()> {
        let Some(stored) = self.session.store().read()? else {
            debug!("No refresh token stored");
            return Err(AuthError::SessionExpired.into());
        };

        info!(tier = %stored.tier, "Refreshing access token");
        let access = self.endpoint.refresh(&stored.pair.refresh).await?;

        // The tier the refresh token came from keeps the pair.
        self.session
            .store()
            .replace_access(&access, stored.tier)?;
        self.session.sync()?;

        debug!("Access token refreshed");
        Ok(())
    }

    fn fail(&self, reason: &str) -> Error {
        self.session.force_logout(reason);
        AuthError::SessionExpired.into()
    }
}

/// Errors that end the session rather than propagate.
fn is_terminal(err: &Error) -> bool {
    matches!(
        err,
        Error::Auth(AuthError::RefreshRejected { .. } | AuthError::SessionExpired)
    )
}

#[async_trait]
impl Middleware for RefreshCoordinator {
    async fn handle(&self, request: &mut ApiRequest, next: Next<'_>) -> Result<ApiResponse> {
        let response = next.run(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        if request.is_retried() {
            return Err(self.fail("request rejected after a refresh"));
        }

        let rejected = request.bearer_token().map(AccessToken::new);
        debug!(path = request.path(), "Request rejected, renewing access token");

        if let Err(e) = self.renew(rejected.as_ref()).await {
            if is_terminal(&e) {
                warn!(error = %e, "Refresh failed");
                return Err(self.fail(&e.to_string()));
            }
            return Err(e);
        }

        request.mark_retried();
        let replay = next.run(request).await?;
        if replay.status() == StatusCode::UNAUTHORIZED {
            return Err(self.fail("replayed request rejected"));
        }
        Ok(replay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Transport;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use reqwest::header::HeaderMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tether_core::error::TransportError;
    use tether_core::{CredentialPair, Credentials, RefreshToken, StorageTier, TokenStore};
    use tether_store::TieredStore;

    fn jwt(id: &str) -> AccessToken {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let claims = serde_json::json!({"jti": id, "exp": exp});
        AccessToken::new(format!(
            "e30.{}.sig",
            URL_SAFE_NO_PAD.encode(claims.to_string())
        ))
    }

    /// Accepts only the token it was told is current.
    struct Gatekeeper {
        accepts: AccessToken,
        seen: AtomicUsize,
    }

    #[async_trait]
    impl Transport for Gatekeeper {
        async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            let status = if request.bearer_token() == Some(self.accepts.as_str()) {
                StatusCode::OK
            } else {
                StatusCode::UNAUTHORIZED
            };
            Ok(ApiResponse::new(status, HeaderMap::new(), Vec::new()))
        }
    }

    enum Outcome {
        Issue(AccessToken),
        Reject,
        Offline,
    }

    /// Scripted refresh endpoint that takes a while to answer.
    struct SlowEndpoint {
        outcome: Outcome,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenEndpoint for SlowEndpoint {
        async fn obtain(&self, _: &Credentials) -> Result<CredentialPair> {
            unreachable!("login is not exercised here")
        }

        async fn refresh(&self, _: &RefreshToken) -> Result<AccessToken> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            match &self.outcome {
                Outcome::Issue(token) => Ok(token.clone()),
                Outcome::Reject => Err(AuthError::RefreshRejected { status: 401 }.into()),
                Outcome::Offline => Err(TransportError::Connection {
                    message: "refused".into(),
                }
                .into()),
            }
        }
    }

    struct Harness {
        store: Arc<TieredStore<tether_store::MemorySlots, tether_store::MemorySlots>>,
        session: SessionContext,
        endpoint: Arc<SlowEndpoint>,
        chain: Vec<Arc<dyn Middleware>>,
        transport: Gatekeeper,
    }

    impl Harness {
        fn new(policy: RefreshPolicy, outcome: Outcome, accepts: AccessToken) -> Self {
            let store = Arc::new(TieredStore::in_memory());
            let session = SessionContext::new(store.clone());
            let endpoint = Arc::new(SlowEndpoint {
                outcome,
                calls: AtomicUsize::new(0),
            });
            let chain: Vec<Arc<dyn Middleware>> = vec![
                Arc::new(RefreshCoordinator::new(
                    session.clone(),
                    endpoint.clone(),
                    policy,
                )),
                Arc::new(crate::auth::BearerAuth::new(store.clone())),
            ];
            Self {
                store,
                session,
                endpoint,
                chain,
                transport: Gatekeeper {
                    accepts,
                    seen: AtomicUsize::new(0),
                },
            }
        }

        fn login(&self, access: AccessToken, tier: StorageTier) {
            self.session
                .login(&CredentialPair::new(access, RefreshToken::new("refresh")), tier)
                .unwrap();
        }

        async fn send(&self) -> Result<ApiResponse> {
            let mut request = ApiRequest::get("requests/");
            Next::new(&self.chain, &self.transport)
                .run(&mut request)
                .await
        }

        fn refresh_calls(&self) -> usize {
            self.endpoint.calls.load(Ordering::SeqCst)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_replays_once_in_same_tier() {
        let fresh = jwt("fresh");
        let h = Harness::new(
            RefreshPolicy::SingleFlight,
            Outcome::Issue(fresh.clone()),
            fresh.clone(),
        );
        h.login(jwt("stale"), StorageTier::Ephemeral);

        let response = h.send().await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h.refresh_calls(), 1);
        assert_eq!(h.transport.seen.load(Ordering::SeqCst), 2);
        let stored = h.store.read().unwrap().unwrap();
        assert_eq!(stored.tier, StorageTier::Ephemeral);
        assert_eq!(stored.pair.access, fresh);
        assert!(h.session.current().is_authenticated);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_refresh_logs_out() {
        let h = Harness::new(RefreshPolicy::SingleFlight, Outcome::Reject, jwt("never"));
        h.login(jwt("stale"), StorageTier::Persistent);

        let err = h.send().await.unwrap_err();

        assert!(err.is_session_expired());
        assert!(h.store.read().unwrap().is_none());
        assert!(!h.session.current().is_authenticated);
    }

    #[tokio::test(start_paused = true)]
    async fn replay_rejection_is_terminal_and_not_refreshed_again() {
        // The server keeps rejecting even the refreshed token.
        let h = Harness::new(
            RefreshPolicy::SingleFlight,
            Outcome::Issue(jwt("fresh")),
            jwt("never"),
        );
        h.login(jwt("stale"), StorageTier::Persistent);

        let err = h.send().await.unwrap_err();

        assert!(err.is_session_expired());
        assert_eq!(h.refresh_calls(), 1);
        assert_eq!(h.transport.seen.load(Ordering::SeqCst), 2);
        assert!(h.store.read().unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_refresh_token_skips_the_network() {
        let h = Harness::new(
            RefreshPolicy::Independent,
            Outcome::Issue(jwt("fresh")),
            jwt("never"),
        );

        let err = h.send().await.unwrap_err();

        assert!(err.is_session_expired());
        assert_eq!(h.refresh_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_keeps_session() {
        let h = Harness::new(RefreshPolicy::SingleFlight, Outcome::Offline, jwt("never"));
        h.login(jwt("stale"), StorageTier::Persistent);

        let err = h.send().await.unwrap_err();

        assert!(err.is_transport());
        assert!(h.store.read().unwrap().is_some());
        assert!(h.session.current().is_authenticated);
    }

    #[tokio::test(start_paused = true)]
    async fn pre_marked_request_is_not_refreshed() {
        let h = Harness::new(
            RefreshPolicy::SingleFlight,
            Outcome::Issue(jwt("fresh")),
            jwt("never"),
        );
        h.login(jwt("stale"), StorageTier::Persistent);

        let mut request = ApiRequest::get("requests/");
        request.mark_retried();
        let err = Next::new(&h.chain, &h.transport)
            .run(&mut request)
            .await
            .unwrap_err();

        assert!(err.is_session_expired());
        assert_eq!(h.refresh_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_rejections_refresh_independently() {
        let fresh = jwt("fresh");
        let h = Harness::new(
            RefreshPolicy::Independent,
            Outcome::Issue(fresh.clone()),
            fresh,
        );
        h.login(jwt("stale"), StorageTier::Persistent);

        let (a, b) = tokio::join!(h.send(), h.send());

        assert_eq!(a.unwrap().status(), StatusCode::OK);
        assert_eq!(b.unwrap().status(), StatusCode::OK);
        assert_eq!(h.refresh_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_rejections_share_one_refresh() {
        let fresh = jwt("fresh");
        let h = Harness::new(
            RefreshPolicy::SingleFlight,
            Outcome::Issue(fresh.clone()),
            fresh,
        );
        h.login(jwt("stale"), StorageTier::Persistent);

        let (a, b, c) = tokio::join!(h.send(), h.send(), h.send());

        assert_eq!(a.unwrap().status(), StatusCode::OK);
        assert_eq!(b.unwrap().status(), StatusCode::OK);
        assert_eq!(c.unwrap().status(), StatusCode::OK);
        assert_eq!(h.refresh_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_see_failed_refresh_as_expired() {
        let h = Harness::new(RefreshPolicy::SingleFlight, Outcome::Reject, jwt("never"));
        h.login(jwt("stale"), StorageTier::Persistent);

        let (a, b) = tokio::join!(h.send(), h.send());

        assert!(a.unwrap_err().is_session_expired());
        assert!(b.unwrap_err().is_session_expired());
        assert_eq!(h.refresh_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_refresh_rewrites_access() {
        let fresh = jwt("fresh");
        let h = Harness::new(
            RefreshPolicy::SingleFlight,
            Outcome::Issue(fresh.clone()),
            fresh.clone(),
        );
        h.login(jwt("stale"), StorageTier::Ephemeral);

        let coordinator = RefreshCoordinator::new(
            h.session.clone(),
            h.endpoint.clone(),
            RefreshPolicy::SingleFlight,
        );
        coordinator.refresh().await.unwrap();

        assert_eq!(h.store.read().unwrap().unwrap().pair.access, fresh);
        assert_eq!(h.refresh_calls(), 1);
    }
}
