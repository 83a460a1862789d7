//! Whoami command implementation.

use anyhow::{Result, bail};
use clap::Args;
use serde_json::json;

use tether_core::TokenStore;

use crate::output;
use crate::session::{self, LOGIN_HINT};

#[derive(Args, Debug)]
pub struct WhoamiArgs {
    /// Print the session as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: WhoamiArgs, base_url: &str) -> Result<()> {
    let (client, state) = session::open(base_url)?;

    if !state.is_authenticated {
        if client.store().read()?.is_some() {
            bail!("Session expired. Run 'tether refresh' or log in again.");
        }
        bail!("No active session. {LOGIN_HINT}");
    }

    let tier = client.store().read()?.map(|stored| stored.tier);
    let claims = state.claims.unwrap_or_default();

    if args.json {
        return output::json_pretty(&json!({
            "claims": claims,
            "is_privileged": state.is_privileged,
            "tier": tier,
        }));
    }

    output::field("User", claims.display_name.as_deref().unwrap_or("-"));
    output::field("User ID", claims.subject_id.as_deref().unwrap_or("-"));
    output::field("Staff", if state.is_privileged { "yes" } else { "no" });
    if let Some(expires) = claims.expires_at_utc() {
        output::field("Expires", &expires.to_rfc3339());
    }
    if let Some(tier) = tier {
        output::field("Stored", &tier.to_string());
    }

    Ok(())
}
