//! Status command implementation.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;

use precast_core::traits::CredentialStore;

use crate::output;
use crate::settings::Settings;

#[derive(Args, Debug)]
pub struct StatusArgs {}

pub async fn run(_args: StatusArgs, settings: &Settings) -> Result<()> {
    let store = settings.store()?;
    output::field("Store", &store.path().display().to_string());

    let Some(pair) = store.get().await.context("Failed to read credentials")? else {
        println!("{}", "Not logged in".yellow());
        return Ok(());
    };

    output::field("Access token", "present");
    output::field(
        "Refresh token",
        if pair.refresh_token.is_some() {
            "present"
        } else {
            "absent"
        },
    );

    match pair.access_token.expires_at() {
        Some(expires_at) if expires_at <= Utc::now() => {
            output::field("Expires", &format!("{} (expired)", expires_at.to_rfc3339()));
        }
        Some(expires_at) => output::field("Expires", &expires_at.to_rfc3339()),
        None => output::field("Expires", "unknown"),
    }

    Ok(())
}
