//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use precast_core::{ApiUrl, Result};

use crate::endpoints::{REFRESH_TOKEN, VALIDATE_SESSION};

/// Settings for the HTTP transport and the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL every relative path is resolved against.
    pub api_url: ApiUrl,

    /// Path of the session validation endpoint.
    #[serde(default = "default_validate_path")]
    pub validate_path: String,

    /// Path of the token refresh endpoint.
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,

    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Idle pooled connections kept per host.
    #[serde(default = "default_max_idle")]
    pub max_idle_per_host: usize,
}

fn default_validate_path() -> String {
    VALIDATE_SESSION.to_string()
}

fn default_refresh_path() -> String {
    REFRESH_TOKEN.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    60
}

fn default_max_idle() -> usize {
    8
}

impl ClientConfig {
    /// Default settings for an API base URL.
    pub fn new(api_url: ApiUrl) -> Self {
        Self {
            api_url,
            validate_path: default_validate_path(),
            refresh_path: default_refresh_path(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            max_idle_per_host: default_max_idle(),
        }
    }

    /// Override the request timeout.
    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Absolute URL of the validation endpoint.
    pub fn validate_url(&self) -> Result<Url> {
        self.api_url.endpoint(&self.validate_path)
    }

    /// Absolute URL of the refresh endpoint.
    pub fn refresh_url(&self) -> Result<Url> {
        self.api_url.endpoint(&self.refresh_path)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"api_url":"https://api.example.com/v1"}"#).unwrap();
        assert_eq!(config.validate_path, "/validate-session");
        assert_eq!(config.refresh_path, "/refresh-token");
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(
            config.validate_url().unwrap().as_str(),
            "https://api.example.com/v1/validate-session"
        );
    }

    #[test]
    fn endpoint_paths_can_be_overridden() {
        let mut config = ClientConfig::new(ApiUrl::new("https://api.example.com").unwrap());
        config.refresh_path = "/auth/refresh".to_string();
        assert_eq!(
            config.refresh_url().unwrap().as_str(),
            "https://api.example.com/auth/refresh"
        );
    }
}
