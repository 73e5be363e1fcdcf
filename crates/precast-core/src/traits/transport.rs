//! Transport trait.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use url::Url;

use crate::error::TransportError;

/// One fully specified HTTP exchange.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl OutgoingRequest {
    /// A POST carrying a JSON payload and no other headers.
    pub fn json_post(url: Url, body: Bytes) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        Self {
            method: Method::POST,
            url,
            headers,
            body: Some(body),
        }
    }
}

/// A completed HTTP exchange with its body read into memory.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Executes HTTP exchanges.
///
/// A transport never retries and never interprets statuses: any response
/// that arrives is `Ok`, only exchanges that could not complete are `Err`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse, TransportError> {
        (**self).send(request).await
    }
}
