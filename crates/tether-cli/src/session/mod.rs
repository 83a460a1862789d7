//! The CLI's session client.

pub mod storage;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use tether_core::{BaseUrl, SessionState};
use tether_http::SessionClient;

/// Per-request timeout for CLI invocations.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Hint printed whenever the user has to sign in again.
pub const LOGIN_HINT: &str = "Run 'tether login' to sign in again.";

/// Build a client over the on-disk token store and restore any saved session.
pub fn open(base_url: &str) -> Result<(SessionClient, SessionState)> {
    let base = BaseUrl::new(base_url).context("Invalid base URL")?;
    let store = storage::open_store().context("Failed to open token storage")?;

    let client = SessionClient::builder(base)
        .store(Arc::new(store))
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;

    let state = client.restore().context("Failed to restore session")?;
    Ok((client, state))
}
