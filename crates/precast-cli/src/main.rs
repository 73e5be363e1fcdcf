//! precast - credential management and authenticated requests from the shell.
//!
//! A thin wrapper over `precast-http`: log in by handing over tokens, then
//! run requests through the same orchestrator an application would use.

mod cli;
mod commands;
mod output;
mod presenter;
mod settings;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use commands::{auth, request};
use settings::Settings;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    let settings = Settings::from_cli(&cli);
    match cli.command {
        Commands::Auth(cmd) => auth::handle(cmd, &settings).await.map(|()| ExitCode::SUCCESS),
        Commands::Request(args) => request::run(args, &settings).await,
    }
}

fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr; stdout carries response bodies.
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
