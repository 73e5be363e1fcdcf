//! Logout command implementation.

use anyhow::{Context, Result};
use clap::Args;

use precast_core::traits::CredentialStore;

use crate::output;
use crate::settings::Settings;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub async fn run(_args: LogoutArgs, settings: &Settings) -> Result<()> {
    settings
        .store()?
        .clear()
        .await
        .context("Failed to clear credentials")?;

    output::success("Logged out");
    Ok(())
}
