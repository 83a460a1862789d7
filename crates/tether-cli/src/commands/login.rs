//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use tether_core::{Credentials, StorageTier};

use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account username
    #[arg(long)]
    pub username: String,

    /// Account password
    #[arg(long, env = "TETHER_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Keep the session across reboots instead of only this login session
    #[arg(long)]
    pub remember: bool,
}

pub async fn run(args: LoginArgs, base_url: &str) -> Result<()> {
    let (client, _) = session::open(base_url)?;
    let credentials = Credentials::new(&args.username, &args.password);

    eprintln!("{}", "Logging in...".dimmed());

    let state = client
        .login(&credentials, args.remember)
        .await
        .context("Failed to login")?;

    output::success("Logged in successfully");
    println!();
    if let Some(name) = state.claims.as_ref().and_then(|c| c.display_name.as_deref()) {
        output::field("User", name);
    }
    output::field("Staff", if state.is_privileged { "yes" } else { "no" });
    output::field("Stored", &StorageTier::from_remember(args.remember).to_string());

    Ok(())
}
