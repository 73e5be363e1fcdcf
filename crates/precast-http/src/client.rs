//! reqwest-backed transport.

use async_trait::async_trait;
use tracing::{debug, instrument, trace};

use precast_core::error::TransportError;
use precast_core::traits::{OutgoingRequest, RawResponse, Transport};
use precast_core::{Error, Result};

use crate::config::ClientConfig;

/// HTTP transport over a pooled `reqwest::Client`.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport from client settings.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("precast/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(config.max_idle_per_host)
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                Error::Transport(TransportError::Http {
                    message: format!("failed to build HTTP client: {}", e),
                })
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(
        &self,
        request: OutgoingRequest,
    ) -> std::result::Result<RawResponse, TransportError> {
        let OutgoingRequest {
            method,
            url,
            headers,
            body,
        } = request;

        debug!(
            body_len = body.as_ref().map(|b| b.len()).unwrap_or(0),
            "Sending HTTP request"
        );

        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            let err = TransportError::from(e);
            debug!(error = %err, "HTTP request did not complete");
            err
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(TransportError::from)?;

        trace!(status = %status, body_len = body.len(), "HTTP response");

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
