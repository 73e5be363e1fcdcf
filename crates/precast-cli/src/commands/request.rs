//! Request command implementation.

use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Args;

use precast_core::{ApiUrl, Method, MultipartForm, OperationRequest, Verdict, classify};
use precast_core::traits::OutcomePresenter;

use crate::output;
use crate::presenter::TerminalPresenter;
use crate::settings::Settings;

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE, ...)
    pub method: String,

    /// Path relative to the API base URL, or an absolute URL
    pub path: String,

    /// JSON body (use - for stdin)
    #[arg(long, conflicts_with_all = ["form", "file"])]
    pub json: Option<String>,

    /// Multipart text field
    #[arg(long, value_name = "NAME=VALUE")]
    pub form: Vec<String>,

    /// Multipart file field
    #[arg(long, value_name = "NAME=PATH")]
    pub file: Vec<String>,

    /// Extra header; overrides generated headers with the same name
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    pub headers: Vec<String>,

    /// Message shown when the request fails
    #[arg(long, default_value = "Request failed")]
    pub message: String,
}

pub async fn run(args: RequestArgs, settings: &Settings) -> Result<ExitCode> {
    let config = settings.client_config()?;
    let orchestrator = settings.orchestrator()?;
    let request = build_request(&args, &config.api_url)?;

    let outcome = orchestrator.execute(&request).await;

    if classify(&outcome) == Verdict::Ok {
        if let Some(body) = outcome.body() {
            output::body(body)?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    TerminalPresenter::new(settings.store()?)
        .present(&outcome, &args.message)
        .await;
    Ok(ExitCode::FAILURE)
}

fn build_request(args: &RequestArgs, api_url: &ApiUrl) -> Result<OperationRequest> {
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method '{}'", args.method))?;
    let url = api_url.endpoint(&args.path).context("Invalid request path")?;

    let mut request = OperationRequest::new(method, url);

    if let Some(ref json) = args.json {
        let value: serde_json::Value = if json == "-" {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            serde_json::from_str(&buf).context("Invalid JSON from stdin")?
        } else {
            serde_json::from_str(json).context("Invalid JSON body")?
        };
        request = request.json(&value).context("Invalid JSON body")?;
    } else if !args.form.is_empty() || !args.file.is_empty() {
        request = request
            .multipart(&build_form(&args.form, &args.file)?)
            .context("Invalid multipart body")?;
    }

    for header in &args.headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("Header '{}' is not 'Name: value'", header))?;
        request = request
            .header(name.trim(), value.trim())
            .with_context(|| format!("Invalid header '{}'", header))?;
    }

    Ok(request)
}

fn build_form(fields: &[String], files: &[String]) -> Result<MultipartForm> {
    let mut form = MultipartForm::new();

    for field in fields {
        let (name, value) = split_assignment(field)?;
        form = form.text(name, value);
    }

    for file in files {
        let (name, path) = split_assignment(file)?;
        let path = Path::new(path);
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        form = form.file(name, filename, content_type_for(path), data);
    }

    Ok(form)
}

fn split_assignment(arg: &str) -> Result<(&str, &str)> {
    match arg.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name, value)),
        _ => bail!("Expected NAME=VALUE, got '{}'", arg),
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "txt" | "csv" => "text/plain",
        _ => "application/octet-stream",
    }
}
