//! Validate command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::output;
use crate::settings::Settings;

use super::stored_pair;

#[derive(Args, Debug)]
pub struct ValidateArgs {}

pub async fn run(_args: ValidateArgs, settings: &Settings) -> Result<()> {
    let orchestrator = settings.orchestrator()?;
    let pair = stored_pair(orchestrator.store()).await?;

    eprintln!("{}", "Validating session...".dimmed());

    let session = orchestrator
        .validator()
        .validate(&pair.access_token)
        .await
        .context("Session validation failed")?;

    output::success("Session is valid");
    output::field("Session", session.id());

    Ok(())
}
