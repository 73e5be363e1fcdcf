//! The normalized result of an orchestrated operation.

use std::fmt;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::error::TransportError;

/// Why an operation ended in [`OperationOutcome::AuthFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailureReason {
    /// No access token stored; the user has to log in.
    NoCredential,
    /// The credential store could not be read.
    StoreUnavailable,
    /// Both header variants were rejected after a successful refresh.
    Rejected,
    /// Both header variants were rejected and no refresh token is stored.
    NoRefreshToken,
    /// Both header variants were rejected and the refresh failed.
    RefreshFailed,
    /// The credential cannot be encoded as a header value.
    MalformedCredential,
}

impl fmt::Display for AuthFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AuthFailureReason::NoCredential => "not logged in",
            AuthFailureReason::StoreUnavailable => "credential store unavailable",
            AuthFailureReason::Rejected => "credentials rejected",
            AuthFailureReason::NoRefreshToken => "credentials expired and no refresh token",
            AuthFailureReason::RefreshFailed => "credentials expired and refresh failed",
            AuthFailureReason::MalformedCredential => "stored credential is malformed",
        };
        f.write_str(text)
    }
}

/// What a caller gets back from the orchestrator.
///
/// Intermediate attempts are never visible; this value is the whole story.
#[derive(Debug)]
pub enum OperationOutcome {
    /// The transport completed with a non-401 status. This includes 4xx and
    /// 5xx business failures, which are left to the caller to interpret.
    Success {
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    },
    /// Authentication could not be established. Terminal.
    AuthFailure {
        last_status: Option<StatusCode>,
        reason: AuthFailureReason,
    },
    /// A network call could not complete.
    TransportFailure { cause: TransportError },
}

impl OperationOutcome {
    /// An auth failure with an explicit last status.
    pub fn auth_failure(last_status: Option<StatusCode>, reason: AuthFailureReason) -> Self {
        OperationOutcome::AuthFailure {
            last_status,
            reason,
        }
    }

    /// Auth failure before any network call.
    pub fn no_credential() -> Self {
        Self::auth_failure(None, AuthFailureReason::NoCredential)
    }

    /// Auth failure after a 401.
    pub fn unauthorized(reason: AuthFailureReason) -> Self {
        Self::auth_failure(Some(StatusCode::UNAUTHORIZED), reason)
    }

    /// Returns the final HTTP status, if any request completed.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            OperationOutcome::Success { status, .. } => Some(*status),
            OperationOutcome::AuthFailure { last_status, .. } => *last_status,
            OperationOutcome::TransportFailure { .. } => None,
        }
    }

    /// Returns the response body for `Success`.
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            OperationOutcome::Success { body, .. } => Some(body),
            _ => None,
        }
    }

    /// True for a `Success` with a 2xx status.
    pub fn is_ok(&self) -> bool {
        matches!(self, OperationOutcome::Success { status, .. } if status.is_success())
    }

    /// Decode a `Success` body as JSON. `None` for other outcomes or
    /// undecodable bodies.
    pub fn json<T: DeserializeOwned>(&self) -> Option<T> {
        self.body().and_then(|b| serde_json::from_slice(b).ok())
    }

    /// The human-readable message a business error body carries.
    ///
    /// Looks for a string `message` field, then `error`.
    pub fn message(&self) -> Option<String> {
        let value: serde_json::Value = self.json()?;
        ["message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string)
    }
}
