use std::path::Path;
use std::process::{Command, Output};

/// Run the CLI binary with an isolated credential file and data directory.
pub fn run_cli(args: &[&str], home: &Path, api: Option<&str>) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_precast"));
    cmd.args(args);
    cmd.env("HOME", home);
    cmd.env("XDG_DATA_HOME", home.join("data"));
    cmd.env("PRECAST_STORE", store_path(home));
    cmd.env_remove("PRECAST_API");
    cmd.env_remove("RUST_LOG");
    if let Some(api) = api {
        cmd.env("PRECAST_API", api);
    }
    cmd.output().expect("Failed to execute CLI")
}

/// Run the CLI and expect success.
pub fn run_cli_success(args: &[&str], home: &Path, api: Option<&str>) -> String {
    let output = run_cli(args, home, api);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Credential file used by [`run_cli`].
pub fn store_path(home: &Path) -> std::path::PathBuf {
    home.join("credentials.json")
}

/// Run the CLI from async tests without blocking the mock server.
#[allow(dead_code)]
pub async fn run_cli_async(args: &[&str], home: &Path, api: &str) -> Output {
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    let home = home.to_path_buf();
    let api = api.to_string();
    tokio::task::spawn_blocking(move || {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_cli(&args, &home, Some(&api))
    })
    .await
    .expect("CLI task panicked")
}
