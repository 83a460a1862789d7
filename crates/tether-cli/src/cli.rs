//! CLI argument definitions.

use clap::Parser;

use crate::commands::Commands;

/// Default API root, a local development server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Session-keeping client for bearer-token APIs.
#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(author, version = env!("TETHER_VERSION"), about, long_about = None)]
pub struct Cli {
    /// API root that token and resource paths are relative to
    #[arg(long, env = "TETHER_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}
