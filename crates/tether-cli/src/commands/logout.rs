//! Logout command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub fn run(_args: LogoutArgs, base_url: &str) -> Result<()> {
    let (client, _) = session::open(base_url)?;
    client.logout().context("Failed to clear stored tokens")?;

    output::success("Logged out");
    Ok(())
}
