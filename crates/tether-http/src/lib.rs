//! tether-http - Bearer-token session client.
//!
//! Every outbound request passes through an explicit middleware chain:
//!
//! 1. [`RefreshCoordinator`] turns a 401 into one refresh exchange and one
//!    replay, or into a terminal logout.
//! 2. [`BearerAuth`] attaches `Authorization: Bearer <access>` from the
//!    token store.
//! 3. Any caller-supplied [`Middleware`].
//! 4. The [`Transport`] (by default [`HttpTransport`], backed by reqwest).
//!
//! # Example
//!
//! ```no_run
//! use tether_core::{BaseUrl, Credentials};
//! use tether_http::SessionClient;
//!
//! # async fn example() -> Result<(), tether_core::Error> {
//! let base = BaseUrl::new("http://127.0.0.1:8000/api")?;
//! let client = SessionClient::builder(base).build()?;
//!
//! client.restore()?;
//! if !client.state().is_authenticated {
//!     client.login(&Credentials::new("2021-00123", "password"), true).await?;
//! }
//!
//! let response = client.get("requests/").await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
mod endpoints;
mod middleware;
mod refresh;
mod request;
mod transport;

pub use auth::BearerAuth;
pub use client::{SessionClient, SessionClientBuilder};
pub use endpoints::{HttpTokenEndpoint, TOKEN_OBTAIN, TOKEN_REFRESH};
pub use middleware::{Middleware, Next};
pub use refresh::{RefreshCoordinator, RefreshPolicy};
pub use request::{ApiRequest, ApiResponse};
pub use reqwest::{Method, StatusCode};
pub use transport::{HttpTransport, Transport};
