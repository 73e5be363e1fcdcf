//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::auth::AuthCommand;
use crate::commands::request::RequestArgs;

/// Authenticated requests against the precast API.
#[derive(Parser, Debug)]
#[command(name = "precast")]
#[command(author, version = env!("PRECAST_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// API base URL
    #[arg(long, env = "PRECAST_API", global = true)]
    pub api: Option<String>,

    /// Credential file (defaults to the platform data directory)
    #[arg(long, env = "PRECAST_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, env = "PRECAST_TIMEOUT", default_value_t = 60, global = true)]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Credential management
    Auth(AuthCommand),

    /// Run one authenticated request
    Request(RequestArgs),
}
