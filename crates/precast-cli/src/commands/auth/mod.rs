//! Credential subcommands.

mod login;
mod logout;
mod refresh;
mod status;
mod validate;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use precast_core::CredentialPair;
use precast_core::traits::CredentialStore;

use crate::settings::Settings;

#[derive(Args, Debug)]
pub struct AuthCommand {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthSubcommand {
    /// Store an access token (and optional refresh token)
    Login(login::LoginArgs),

    /// Remove stored credentials
    Logout(logout::LogoutArgs),

    /// Show what is stored
    Status(status::StatusArgs),

    /// Exchange the access token for a session id
    Validate(validate::ValidateArgs),

    /// Exchange the refresh token for a new access token
    Refresh(refresh::RefreshArgs),
}

pub async fn handle(cmd: AuthCommand, settings: &Settings) -> Result<()> {
    match cmd.command {
        AuthSubcommand::Login(args) => login::run(args, settings).await,
        AuthSubcommand::Logout(args) => logout::run(args, settings).await,
        AuthSubcommand::Status(args) => status::run(args, settings).await,
        AuthSubcommand::Validate(args) => validate::run(args, settings).await,
        AuthSubcommand::Refresh(args) => refresh::run(args, settings).await,
    }
}

/// Load the stored pair or explain how to get one.
async fn stored_pair<S: CredentialStore>(store: &S) -> Result<CredentialPair> {
    store
        .get()
        .await
        .context("Failed to read credentials")?
        .context("Not logged in. Run 'precast auth login' first.")
}
