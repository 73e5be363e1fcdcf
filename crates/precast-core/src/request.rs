//! Operation requests handed to the orchestrator.

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use url::Url;

use crate::error::InvalidInputError;
use crate::multipart::MultipartForm;

/// A fully buffered request body and its content type.
///
/// Cloning shares the underlying buffer, so every attempt sends exactly the
/// same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    content_type: String,
    bytes: Bytes,
}

impl Body {
    /// Create a body from a content type and bytes.
    pub fn new(content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Serialize a value as a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, InvalidInputError> {
        let bytes = serde_json::to_vec(value).map_err(|e| InvalidInputError::Body {
            reason: e.to_string(),
        })?;
        Ok(Self::new("application/json", bytes))
    }

    /// Returns the content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Returns the buffered bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Returns the body length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true for a zero-length body.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One logical API call a caller wants performed.
///
/// Immutable once built: the orchestrator only ever reads it, attaching
/// auth headers per attempt.
///
/// # Example
///
/// ```
/// use precast_core::OperationRequest;
/// use reqwest::Method;
///
/// let url = url::Url::parse("https://api.example.com/elements").unwrap();
/// let request = OperationRequest::new(Method::POST, url)
///     .header("x-client", "yard-app")
///     .unwrap()
///     .json(&serde_json::json!({"mark": "P-104"}))
///     .unwrap();
/// assert_eq!(request.body().unwrap().content_type(), "application/json");
/// ```
#[derive(Debug, Clone)]
pub struct OperationRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Body>,
}

impl OperationRequest {
    /// Create a request with no body and no extra headers.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Shorthand for a GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Shorthand for a POST request.
    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// Add a caller header. Caller headers override generated ones.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self, InvalidInputError> {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| InvalidInputError::Header {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| InvalidInputError::Header {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        self.headers.append(header_name, header_value);
        Ok(self)
    }

    /// Replace all caller headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Attach a JSON body, serialized once.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, InvalidInputError> {
        Ok(self.with_body(Body::json(value)?))
    }

    /// Attach a multipart body, encoded once.
    pub fn multipart(self, form: &MultipartForm) -> Result<Self, InvalidInputError> {
        Ok(self.with_body(form.encode()?))
    }

    /// Attach a pre-built body.
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn url() -> Url {
        Url::parse("https://api.example.com/elements").unwrap()
    }

    #[test]
    fn json_body_is_serialized_once() {
        let request = OperationRequest::post(url())
            .json(&json!({"mark": "P-104", "weight": 12.5}))
            .unwrap();
        let body = request.body().unwrap();
        assert_eq!(body.content_type(), "application/json");
        let parsed: serde_json::Value = serde_json::from_slice(body.bytes()).unwrap();
        assert_eq!(parsed["mark"], "P-104");
    }

    #[test]
    fn header_validation() {
        assert!(OperationRequest::get(url()).header("bad header", "v").is_err());
        assert!(OperationRequest::get(url()).header("x-ok", "bad\nvalue").is_err());

        let request = OperationRequest::get(url()).header("X-Trace", "abc").unwrap();
        assert_eq!(request.headers()["x-trace"], "abc");
    }

    #[test]
    fn multipart_body_carries_boundary() {
        let form = MultipartForm::with_boundary("B1").text("k", "v");
        let request = OperationRequest::post(url()).multipart(&form).unwrap();
        assert_eq!(
            request.body().unwrap().content_type(),
            "multipart/form-data; boundary=B1"
        );
    }

    #[test]
    fn get_has_no_body() {
        let request = OperationRequest::get(url());
        assert_eq!(*request.method(), Method::GET);
        assert!(request.body().is_none());
    }
}
