//! Subcommand implementations.

mod login;
mod logout;
mod refresh;
mod request;
mod whoami;

use anyhow::Result;
use clap::Subcommand;

pub use request::RequestArgs;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and store the token pair
    Login(login::LoginArgs),

    /// Forget the stored tokens
    Logout(logout::LogoutArgs),

    /// Display the current session
    Whoami(whoami::WhoamiArgs),

    /// Send an authenticated request
    Request(RequestArgs),

    /// Exchange the refresh token for a new access token
    Refresh(refresh::RefreshArgs),
}

pub async fn handle(cmd: Commands, base_url: &str) -> Result<()> {
    match cmd {
        Commands::Login(args) => login::run(args, base_url).await,
        Commands::Logout(args) => logout::run(args, base_url),
        Commands::Whoami(args) => whoami::run(args, base_url),
        Commands::Request(args) => request::run(args, base_url).await,
        Commands::Refresh(args) => refresh::run(args, base_url).await,
    }
}
