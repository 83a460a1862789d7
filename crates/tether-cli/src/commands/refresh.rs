//! Refresh command implementation.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

use crate::output;
use crate::session::{self, LOGIN_HINT};

#[derive(Args, Debug)]
pub struct RefreshArgs {}

pub async fn run(_args: RefreshArgs, base_url: &str) -> Result<()> {
    let (client, _) = session::open(base_url)?;

    eprintln!("{}", "Refreshing session...".dimmed());

    let state = match client.refresh().await {
        Ok(state) => state,
        Err(e) if e.is_session_expired() => bail!("Session expired. {LOGIN_HINT}"),
        Err(e) => return Err(anyhow::Error::new(e).context("Failed to refresh session")),
    };

    output::success("Session refreshed successfully");
    if let Some(expires) = state.claims.as_ref().and_then(|c| c.expires_at_utc()) {
        output::field("Expires", &expires.to_rfc3339());
    }

    Ok(())
}
