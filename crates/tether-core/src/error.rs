//! Error types for the tether session layer.
//!
//! Authorization failures, transport failures, protocol failures, storage
//! failures and input validation failures each get their own variant so that
//! callers can tell a dead session apart from a connectivity blip.

use std::fmt;
use thiserror::Error;

/// The unified error type for tether operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors (bad login, malformed token, dead session).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Protocol errors (unexpected status or response body).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Token storage errors.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input validation errors (base URL, header values).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl Error {
    /// Returns true if this is the terminal "session expired" signal.
    ///
    /// Callers should route the user back to the login view.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::Auth(AuthError::SessionExpired))
    }

    /// Returns true if this is a transport failure.
    ///
    /// Transport failures never end the session.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token issuance endpoint rejected the username/password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A stored or received token could not be decoded.
    #[error("malformed token: {reason}")]
    MalformedToken { reason: String },

    /// The refresh endpoint rejected the refresh token.
    #[error("refresh token rejected (HTTP {status})")]
    RefreshRejected { status: u16 },

    /// The session ended and the client is logged out.
    #[error("session expired")]
    SessionExpired,
}

/// Protocol-level errors from HTTP responses.
#[derive(Debug)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Error detail reported by the server, if any.
    pub detail: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref detail) = self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, detail: Option<String>) -> Self {
        Self { status, detail }
    }

    /// Check if this is an authorization rejection.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

/// Token storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// Stored data could not be parsed or serialized.
    #[error("corrupt token data in {path}: {message}")]
    Corrupt { path: String, message: String },
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid base URL.
    #[error("invalid base URL '{value}': {reason}")]
    BaseUrl { value: String, reason: String },

    /// A token contains characters that cannot go into an HTTP header.
    #[error("invalid header value for {name}")]
    HeaderValue { name: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}
