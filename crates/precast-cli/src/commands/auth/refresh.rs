//! Refresh command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::output;
use crate::settings::Settings;

use super::stored_pair;

#[derive(Args, Debug)]
pub struct RefreshArgs {}

pub async fn run(_args: RefreshArgs, settings: &Settings) -> Result<()> {
    let orchestrator = settings.orchestrator()?;
    let pair = stored_pair(orchestrator.store()).await?;

    eprintln!("{}", "Refreshing access token...".dimmed());

    let access_token = orchestrator
        .refresher()
        .refresh(&pair)
        .await
        .context("Failed to refresh access token")?;

    output::success("Access token refreshed");
    if let Some(expires_at) = access_token.expires_at() {
        output::field("Expires", &expires_at.to_rfc3339());
    }

    Ok(())
}
