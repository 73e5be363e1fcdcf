//! Login command implementation.

use anyhow::{Context, Result, bail};
use clap::Args;

use precast_core::CredentialPair;
use precast_core::traits::CredentialStore;

use crate::output;
use crate::settings::Settings;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Access token issued by the identity service
    #[arg(long)]
    pub access_token: String,

    /// Refresh token, if one was issued
    #[arg(long)]
    pub refresh_token: Option<String>,
}

pub async fn run(args: LoginArgs, settings: &Settings) -> Result<()> {
    if args.access_token.trim().is_empty() {
        bail!("Access token must not be empty");
    }

    let store = settings.store()?;
    let pair = CredentialPair::new(args.access_token, args.refresh_token);
    let expires_at = pair.access_token.expires_at();
    let has_refresh = pair.refresh_token.is_some();

    store
        .set(pair)
        .await
        .context("Failed to save credentials")?;

    output::success("Credentials saved");
    output::field("Store", &store.path().display().to_string());
    output::field("Refresh token", if has_refresh { "yes" } else { "no" });
    if let Some(expires_at) = expires_at {
        output::field("Expires", &expires_at.to_rfc3339());
    }

    Ok(())
}
