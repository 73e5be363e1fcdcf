//! Buffered `multipart/form-data` encoding.
//!
//! Forms are encoded once into a single byte buffer with a boundary fixed at
//! encode time, so the same bytes can be re-sent on every attempt of an
//! orchestrated operation.

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::error::InvalidInputError;
use crate::request::Body;

#[derive(Debug, Clone)]
struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

/// A multipart form held entirely in memory.
///
/// # Example
///
/// ```
/// use precast_core::MultipartForm;
///
/// let body = MultipartForm::new()
///     .text("elementId", "P-104")
///     .file("photo", "crack.jpg", "image/jpeg", vec![0xff, 0xd8])
///     .encode()
///     .unwrap();
/// assert!(body.content_type().starts_with("multipart/form-data; boundary="));
/// ```
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    /// Create an empty form with a random boundary.
    pub fn new() -> Self {
        Self::with_boundary(format!("precast-{}", Uuid::new_v4().simple()))
    }

    /// Create an empty form with a caller-chosen boundary.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    /// Returns the boundary string.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Add a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(Part {
            name: name.into(),
            filename: None,
            content_type: None,
            data: Bytes::from(value.into()),
        });
        self
    }

    /// Add a file field.
    pub fn file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(Part {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: Some(content_type.into()),
            data: data.into(),
        });
        self
    }

    /// Encode the form into a replayable body.
    ///
    /// # Errors
    ///
    /// Fails if a field name, file name or content type contains a quote or
    /// a line break, or if the boundary occurs inside a part's data.
    pub fn encode(&self) -> Result<Body, InvalidInputError> {
        let delimiter = format!("--{}", self.boundary);
        let mut buf = BytesMut::new();

        for part in &self.parts {
            check_token("field name", &part.name)?;
            if let Some(ref filename) = part.filename {
                check_token("file name", filename)?;
            }
            if let Some(ref content_type) = part.content_type {
                check_token("content type", content_type)?;
            }
            if contains(&part.data, delimiter.as_bytes()) {
                return Err(InvalidInputError::Body {
                    reason: format!("part '{}' contains the multipart boundary", part.name),
                });
            }

            buf.put_slice(delimiter.as_bytes());
            buf.put_slice(b"\r\n");

            let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
            if let Some(ref filename) = part.filename {
                disposition.push_str(&format!("; filename=\"{}\"", filename));
            }
            buf.put_slice(disposition.as_bytes());
            buf.put_slice(b"\r\n");

            if let Some(ref content_type) = part.content_type {
                buf.put_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
            }

            buf.put_slice(b"\r\n");
            buf.put_slice(&part.data);
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(delimiter.as_bytes());
        buf.put_slice(b"--\r\n");

        Ok(Body::new(
            format!("multipart/form-data; boundary={}", self.boundary),
            buf.freeze(),
        ))
    }
}

fn check_token(what: &str, value: &str) -> Result<(), InvalidInputError> {
    if value.contains(['"', '\r', '\n']) {
        return Err(InvalidInputError::Body {
            reason: format!("{} '{}' contains a quote or line break", what, value.escape_debug()),
        });
    }
    Ok(())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
