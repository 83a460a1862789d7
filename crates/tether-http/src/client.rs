//! The session-aware client.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, instrument};

use tether_core::{
    BaseUrl, Credentials, Result, SessionContext, SessionState, StorageTier, TokenEndpoint,
    TokenStore,
};
use tether_store::TieredStore;

use crate::auth::BearerAuth;
use crate::endpoints::HttpTokenEndpoint;
use crate::middleware::{Middleware, Next};
use crate::refresh::{RefreshCoordinator, RefreshPolicy};
use crate::request::{ApiRequest, ApiResponse};
use crate::transport::{HttpTransport, Transport};

/// Builder for [`SessionClient`].
pub struct SessionClientBuilder {
    base: BaseUrl,
    store: Option<Arc<dyn TokenStore>>,
    endpoint: Option<Arc<dyn TokenEndpoint>>,
    transport: Option<Arc<dyn Transport>>,
    policy: RefreshPolicy,
    timeout: Option<Duration>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl SessionClientBuilder {
    fn new(base: BaseUrl) -> Self {
        Self {
            base,
            store: None,
            endpoint: None,
            transport: None,
            policy: RefreshPolicy::default(),
            timeout: None,
            middleware: Vec::new(),
        }
    }

    /// Token storage. Defaults to an in-memory two-tier store.
    pub fn store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Token issuance and refresh. Defaults to [`HttpTokenEndpoint`] over the
    /// client's transport.
    pub fn endpoint(mut self, endpoint: Arc<dyn TokenEndpoint>) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Replace the reqwest transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Per-request timeout for the default transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Append a middleware. Runs after the bearer header is attached, in the
    /// order added.
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn build(self) -> Result<SessionClient> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(match self.timeout {
                Some(timeout) => HttpTransport::with_timeout(self.base.clone(), timeout)?,
                None => HttpTransport::new(self.base.clone())?,
            }),
        };
        let store: Arc<dyn TokenStore> = match self.store {
            Some(store) => store,
            None => Arc::new(TieredStore::in_memory()),
        };
        let endpoint: Arc<dyn TokenEndpoint> = match self.endpoint {
            Some(endpoint) => endpoint,
            None => Arc::new(HttpTokenEndpoint::new(transport.clone())),
        };

        let session = SessionContext::new(store.clone());
        let coordinator = Arc::new(RefreshCoordinator::new(
            session.clone(),
            endpoint.clone(),
            self.policy,
        ));

        let mut chain: Vec<Arc<dyn Middleware>> = vec![
            coordinator.clone(),
            Arc::new(BearerAuth::new(store)),
        ];
        chain.extend(self.middleware);

        Ok(SessionClient {
            inner: Arc::new(ClientInner {
                base: self.base,
                session,
                endpoint,
                transport,
                coordinator,
                chain,
            }),
        })
    }
}

/// An HTTP client that carries a bearer-token session.
///
/// Cheap to clone; clones share the session, the store and the refresh gate.
#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base: BaseUrl,
    session: SessionContext,
    endpoint: Arc<dyn TokenEndpoint>,
    transport: Arc<dyn Transport>,
    coordinator: Arc<RefreshCoordinator>,
    chain: Vec<Arc<dyn Middleware>>,
}

impl SessionClient {
    pub fn builder(base: BaseUrl) -> SessionClientBuilder {
        SessionClientBuilder::new(base)
    }

    pub fn base(&self) -> &BaseUrl {
        &self.inner.base
    }

    /// Exchange credentials for a token pair and start a session.
    ///
    /// `remember` picks the persistent tier. The exchange bypasses the
    /// middleware chain: a rejected login never triggers a refresh.
    #[instrument(skip(self, credentials), fields(username = %credentials.username()))]
    pub async fn login(&self, credentials: &Credentials, remember: bool) -> Result<SessionState> {
        let pair = self.inner.endpoint.obtain(credentials).await?;
        self.inner
            .session
            .login(&pair, StorageTier::from_remember(remember))
    }

    pub fn logout(&self) -> Result<()> {
        self.inner.session.logout()
    }

    /// Pick up tokens left by a previous run. Never touches the network.
    pub fn restore(&self) -> Result<SessionState> {
        self.inner.session.restore()
    }

    /// Refresh the access token now.
    pub async fn refresh(&self) -> Result<SessionState> {
        self.inner.coordinator.refresh().await?;
        Ok(self.inner.session.current())
    }

    pub fn session(&self) -> &SessionContext {
        &self.inner.session
    }

    pub fn state(&self) -> SessionState {
        self.inner.session.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.session.subscribe()
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        self.inner.session.store()
    }

    /// Send a request through the middleware chain.
    #[instrument(skip(self, request), fields(method = %request.method(), path = request.path()))]
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        let response = Next::new(&self.inner.chain, self.inner.transport.as_ref())
            .run(&mut request)
            .await?;
        debug!(status = %response.status(), retried = request.is_retried(), "Request complete");
        Ok(response)
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        self.send(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        self.send(ApiRequest::put(path).json(body)?).await
    }

    pub async fn patch<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        self.send(ApiRequest::patch(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.send(ApiRequest::delete(path)).await
    }

    /// GET `path` and decode a successful JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get(path).await?.error_for_status()?.json()
    }
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("base", &self.inner.base)
            .field("policy", &self.inner.coordinator.policy())
            .field("layers", &self.inner.chain.len())
            .finish_non_exhaustive()
    }
}
