//! Auth endpoint paths and wire types.

use serde::{Deserialize, Serialize};

use precast_core::error::ProtocolError;
use precast_core::traits::RawResponse;

/// Default path of the session validation endpoint.
pub const VALIDATE_SESSION: &str = "/validate-session";

/// Default path of the token refresh endpoint.
pub const REFRESH_TOKEN: &str = "/refresh-token";

/// Request body for validate-session.
#[derive(Debug, Serialize)]
pub(crate) struct ValidateSessionRequest<'a> {
    pub token: &'a str,
}

/// Response from validate-session.
///
/// The server also sends descriptive fields (`hostName`, `roleName`, ...)
/// that are not needed here; unknown fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ValidateSessionResponse {
    pub session_id: Option<String>,
}

/// Request body for refresh-token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

/// Response from refresh-token.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshTokenResponse {
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Error body format shared by the API's endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
    pub message: Option<String>,
}

/// Build a protocol error from a non-success response.
pub(crate) fn protocol_error(response: &RawResponse) -> ProtocolError {
    let status = response.status.as_u16();
    match serde_json::from_slice::<ErrorBody>(&response.body) {
        Ok(body) => ProtocolError::new(status, body.error, body.message),
        Err(_) => ProtocolError::new(status, None, None),
    }
}
