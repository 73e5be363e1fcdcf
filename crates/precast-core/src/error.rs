//! Error types for precast.
//!
//! This module provides a unified error type with explicit variants for
//! transport, authentication, protocol, input validation and credential
//! storage errors.

use std::fmt;
use thiserror::Error;

/// The unified error type for precast operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors (no usable session).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Protocol errors (unexpected statuses or response bodies).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Input validation errors (bad URL, bad header value).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// Credential store errors.
    #[error("credential store error: {0}")]
    Store(#[from] StoreError),
}

/// Transport-level errors.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Reading the response body failed.
    #[error("body error: {message}")]
    Body { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else if err.is_body() || err.is_decode() {
            TransportError::Body {
                message: err.to_string(),
            }
        } else {
            TransportError::Http {
                message: err.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(TransportError::from(err))
    }
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The session validation endpoint returned no usable session.
    #[error("session validation failed: {reason}")]
    SessionUnavailable { reason: String },
}

/// Why a refresh attempt produced no new access token.
///
/// Cloneable so that one in-flight refresh can hand the same result to
/// every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// No refresh token is stored.
    #[error("no refresh token available")]
    NoRefreshToken,

    /// The refresh endpoint answered with a non-success status.
    #[error("refresh rejected with HTTP {status}")]
    Rejected { status: u16 },

    /// The refresh endpoint answered 2xx without a usable access token.
    #[error("invalid refresh response: {message}")]
    InvalidResponse { message: String },

    /// The refresh request did not complete.
    #[error("refresh transport failure: {message}")]
    Transport { message: String },

    /// The refreshed pair could not be persisted.
    #[error("could not persist refreshed credentials: {message}")]
    Store { message: String },

    /// The refresh task ended without producing a result.
    #[error("refresh task aborted")]
    Aborted,
}

/// Protocol-level errors from API responses.
#[derive(Debug)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Error code from the body (if present).
    pub error: Option<String>,
    /// Error message from the body (if present).
    pub message: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref error) = self.error {
            write!(f, " [{}]", error)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, error: Option<String>, message: Option<String>) -> Self {
        Self {
            status,
            error,
            message,
        }
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Header name or value that cannot be sent.
    #[error("invalid header '{name}': {reason}")]
    Header { name: String, reason: String },

    /// Body that could not be serialized.
    #[error("invalid body: {reason}")]
    Body { reason: String },
}

/// Credential store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failed.
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Stored data could not be decoded.
    #[error("corrupt credential file: {message}")]
    Corrupt { message: String },
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_display_includes_code_and_message() {
        let err = ProtocolError::new(
            400,
            Some("InvalidRequest".to_string()),
            Some("missing field".to_string()),
        );
        assert_eq!(err.to_string(), "HTTP 400 [InvalidRequest]: missing field");
        assert_eq!(ProtocolError::new(503, None, None).to_string(), "HTTP 503");
    }

    #[test]
    fn session_error_nests_into_error() {
        let err: Error = AuthError::SessionUnavailable {
            reason: "response carried no session id".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "authentication error: session validation failed: response carried no session id"
        );
    }
}
