//! Request and response values carried through the middleware chain.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use tether_core::error::{InvalidInputError, ProtocolError};
use tether_core::{AccessToken, Error, Result};

/// Maximum length for response bodies quoted in error messages.
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// An outbound request, relative to the client's base URL.
///
/// Requests are cloned for replay, so they own everything they carry.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<serde_json::Value>,
    retried: bool,
}

impl ApiRequest {
    /// Create a request for `path` relative to the base URL.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append query parameters.
    pub fn query(mut self, params: &[(&str, &str)]) -> Self {
        self.query
            .extend(params.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        self
    }

    /// Set a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body).map_err(|e| InvalidInputError::Other {
            message: format!("request body is not serializable: {}", e),
        })?;
        self.body = Some(value);
        Ok(self)
    }

    /// Set a header.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| InvalidInputError::HeaderValue {
                name: name.to_string(),
            })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| InvalidInputError::HeaderValue {
                name: name.to_string(),
            })?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    /// The bearer token currently attached, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
    }

    /// Attach `Authorization: Bearer <token>`, replacing any previous value.
    pub fn set_bearer(&mut self, token: &AccessToken) -> Result<()> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.as_str())).map_err(
            |_| InvalidInputError::HeaderValue {
                name: AUTHORIZATION.to_string(),
            },
        )?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    /// Whether this request has already been replayed after a refresh.
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// Mark this request as replayed. A marked request is never refreshed again.
    pub fn mark_retried(&mut self) {
        self.retried = true;
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ProtocolError::new(
                self.status.as_u16(),
                Some(format!("invalid JSON body: {}", e)),
            )
            .into()
        })
    }

    /// Turn a non-success status into a [`ProtocolError`].
    ///
    /// The error detail is the server's `detail` field when the body carries
    /// one, otherwise the (truncated) body text.
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_success() {
            return Ok(self);
        }
        Err(Error::Protocol(ProtocolError::new(
            self.status.as_u16(),
            self.error_detail(),
        )))
    }

    fn error_detail(&self) -> Option<String> {
        if self.body.is_empty() {
            return None;
        }

        #[derive(serde::Deserialize)]
        struct Detail {
            detail: String,
        }

        if let Ok(Detail { detail }) = serde_json::from_slice::<Detail>(&self.body) {
            return Some(detail);
        }

        let text = self.text();
        if text.len() <= MAX_ERROR_BODY_LENGTH {
            Some(text)
        } else {
            let cut = text
                .char_indices()
                .map(|(i, _)| i)
                .take_while(|i| *i <= MAX_ERROR_BODY_LENGTH)
                .last()
                .unwrap_or(0);
            Some(format!(
                "{}... (truncated, {} total bytes)",
                &text[..cut],
                text.len()
            ))
        }
    }
}
