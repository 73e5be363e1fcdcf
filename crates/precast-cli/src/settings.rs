//! Resolved global settings: API location, credential file, timeouts.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use precast_core::ApiUrl;
use precast_http::{ClientConfig, HttpTransport, RequestOrchestrator};
use precast_store::FileCredentialStore;

use crate::cli::Cli;

pub type Orchestrator = RequestOrchestrator<HttpTransport, FileCredentialStore>;

#[derive(Debug, Clone)]
pub struct Settings {
    api: Option<String>,
    store: Option<PathBuf>,
    timeout_secs: u64,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            api: cli.api.clone(),
            store: cli.store.clone(),
            timeout_secs: cli.timeout,
        }
    }

    /// Path of the credential file.
    pub fn store_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.store {
            return Ok(path.clone());
        }

        let dirs =
            ProjectDirs::from("", "", "precast").context("Could not determine data directory")?;
        Ok(dirs.data_dir().join("credentials.json"))
    }

    pub fn store(&self) -> Result<Arc<FileCredentialStore>> {
        Ok(Arc::new(FileCredentialStore::new(self.store_path()?)))
    }

    pub fn client_config(&self) -> Result<ClientConfig> {
        let api = self
            .api
            .as_deref()
            .context("No API URL. Pass --api or set PRECAST_API.")?;
        let api_url = ApiUrl::new(api).context("Invalid API URL")?;
        Ok(ClientConfig::new(api_url).with_request_timeout(self.timeout_secs))
    }

    /// Orchestrator over the configured API and credential file.
    pub fn orchestrator(&self) -> Result<Orchestrator> {
        let config = self.client_config()?;
        RequestOrchestrator::http(&config, self.store()?).context("Failed to create HTTP client")
    }
}
