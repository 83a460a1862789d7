//! Process-wide session state derived from the token store.
//!
//! [`SessionContext`] answers "am I logged in / am I privileged / who am I"
//! and broadcasts every change over a [`tokio::sync::watch`] channel. The
//! state is never mutated on its own: every transition goes through the
//! [`TokenStore`] first and then republishes what the store now holds.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::codec::{self, Claims};
use crate::error::{AuthError, Error, StorageError};
use crate::traits::TokenStore;
use crate::types::StorageTier;
use crate::{CredentialPair, Result};

/// The observable session: a pure function of the token store's contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub is_authenticated: bool,
    pub is_privileged: bool,
    pub claims: Option<Claims>,
}

impl SessionState {
    /// The logged-out state.
    pub fn logged_out() -> Self {
        Self::default()
    }

    /// The authenticated state for a decoded access token.
    pub fn authenticated(claims: Claims) -> Self {
        Self {
            is_authenticated: true,
            is_privileged: claims.is_privileged,
            claims: Some(claims),
        }
    }
}

/// Holder of the current [`SessionState`].
///
/// Cheap to clone; clones share the same store and channel.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    store: Arc<dyn TokenStore>,
    state: watch::Sender<SessionState>,
    // Held across every store mutation and the publish that follows it.
    transition: Mutex<()>,
}

impl SessionContext {
    /// Create a logged-out context over `store`.
    ///
    /// Call [`restore`](Self::restore) to pick up tokens left by a previous run.
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(SessionState::logged_out());
        Self {
            inner: Arc::new(ContextInner {
                store,
                state,
                transition: Mutex::new(()),
            }),
        }
    }

    /// The token store this context derives its state from.
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.inner.store
    }

    /// The current state.
    pub fn current(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Record a fresh login.
    ///
    /// The access token is decoded before anything is written, so a malformed
    /// token leaves the store and the state untouched. Both tiers are cleared
    /// before the new pair is written: only one tier is active per login.
    #[instrument(skip(self, pair), fields(%tier))]
    pub fn login(&self, pair: &CredentialPair, tier: StorageTier) -> Result<SessionState> {
        let claims = codec::decode(pair.access.as_str())?;

        let _guard = self.lock();
        self.inner.store.clear()?;
        self.inner.store.write(pair, tier)?;

        let state = SessionState::authenticated(claims);
        info!(
            user = state.claims.as_ref().and_then(|c| c.display_name.as_deref()),
            privileged = state.is_privileged,
            "Logged in"
        );
        self.publish(state.clone());
        Ok(state)
    }

    /// Log out: clear both tiers and publish the logged-out state.
    ///
    /// Idempotent. The logged-out state is published even if clearing the
    /// store fails; the storage error is still returned.
    #[instrument(skip(self))]
    pub fn logout(&self) -> Result<()> {
        let _guard = self.lock();
        let cleared = self.inner.store.clear();
        self.publish(SessionState::logged_out());
        info!("Logged out");
        cleared
    }

    /// Terminal failure: clear everything and publish logged-out.
    ///
    /// Storage errors are logged rather than returned; the caller is already
    /// reporting the session as expired.
    pub fn force_logout(&self, reason: &str) {
        let _guard = self.lock();
        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "Failed to clear token store during forced logout");
        }
        self.publish(SessionState::logged_out());
        warn!(reason, "Session ended");
    }

    /// Silent restore on start-up.
    ///
    /// Publishes the authenticated state without any network call when the
    /// stored access token is still valid. An expired token stays in the store
    /// so the first rejected request can drive a refresh.
    #[instrument(skip(self))]
    pub fn restore(&self) -> Result<SessionState> {
        self.inner.store.init()?;
        let state = self.sync()?;
        debug!(authenticated = state.is_authenticated, "Session restored");
        Ok(state)
    }

    /// Recompute the state from the store and publish it.
    pub fn sync(&self) -> Result<SessionState> {
        self.sync_at(Utc::now())
    }

    fn sync_at(&self, now: DateTime<Utc>) -> Result<SessionState> {
        let _guard = self.lock();

        let stored = match self.inner.store.read() {
            Ok(stored) => stored,
            Err(Error::Storage(StorageError::Corrupt { path, message })) => {
                warn!(%path, %message, "Discarding unreadable token storage");
                self.inner.store.clear()?;
                None
            }
            Err(e) => return Err(e),
        };
        let Some(stored) = stored else {
            let state = SessionState::logged_out();
            self.publish(state.clone());
            return Ok(state);
        };

        let state = match codec::decode(stored.pair.access.as_str()) {
            Ok(claims) if codec::is_expired(&claims, now) => {
                debug!(tier = %stored.tier, "Stored access token has expired");
                SessionState::logged_out()
            }
            Ok(claims) => SessionState::authenticated(claims),
            Err(Error::Auth(AuthError::MalformedToken { reason })) => {
                warn!(%reason, tier = %stored.tier, "Discarding malformed stored token");
                self.inner.store.clear()?;
                SessionState::logged_out()
            }
            Err(e) => return Err(e),
        };

        self.publish(state.clone());
        Ok(state)
    }

    fn publish(&self, state: SessionState) {
        self.inner.state.send_replace(state);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.inner
            .transition
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}
