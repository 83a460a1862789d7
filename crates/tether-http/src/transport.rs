//! HTTP transport: the innermost step of the middleware chain.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderValue};
use tracing::{debug, instrument, trace};

use tether_core::error::TransportError;
use tether_core::{BaseUrl, Error, Result};

use crate::request::{ApiRequest, ApiResponse};

/// Sends a fully prepared request and buffers the response.
///
/// Any status code is a successful send; only failures to get a response at
/// all are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// Map a reqwest error onto the transport taxonomy.
pub(crate) fn transport_error(err: reqwest::Error) -> Error {
    let err = if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    };
    Error::Transport(err)
}

/// reqwest-backed transport bound to a base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: BaseUrl,
}

impl HttpTransport {
    /// Create a transport with reqwest's default timeouts.
    pub fn new(base: BaseUrl) -> Result<Self> {
        Self::build(base, None)
    }

    /// Create a transport that gives up on a request after `timeout`.
    pub fn with_timeout(base: BaseUrl, timeout: Duration) -> Result<Self> {
        Self::build(base, Some(timeout))
    }

    fn build(base: BaseUrl, timeout: Option<Duration>) -> Result<Self> {
        let mut builder =
            reqwest::Client::builder().user_agent(concat!("tether/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(transport_error)?;

        Ok(Self { client, base })
    }

    /// Returns the base URL this transport is configured for.
    pub fn base(&self) -> &BaseUrl {
        &self.base
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method(), path = request.path()))]
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = self.base.endpoint_url(request.path());
        debug!(%url, authenticated = request.bearer_token().is_some(), "HTTP request");

        let mut builder = self
            .client
            .request(request.method().clone(), &url)
            .headers(request.headers().clone());

        if !request.headers().contains_key(ACCEPT) {
            builder = builder.header(ACCEPT, HeaderValue::from_static("application/json"));
        }
        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(transport_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(transport_error)?;
        trace!(status = %status, bytes = body.len(), "HTTP response");

        Ok(ApiResponse::new(status, headers, body.to_vec()))
    }
}
