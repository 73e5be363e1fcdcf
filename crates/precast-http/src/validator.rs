//! Session validation.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::HeaderValue;
use tracing::{debug, instrument};
use url::Url;

use precast_core::error::{AuthError, Error, InvalidInputError};
use precast_core::traits::{OutgoingRequest, Transport};
use precast_core::{AccessToken, Result, Session};

use crate::endpoints::{ValidateSessionRequest, ValidateSessionResponse, protocol_error};

/// Exchanges an access token for a server-confirmed session id.
pub struct SessionValidator<T: ?Sized> {
    transport: Arc<T>,
    url: Url,
}

impl<T: Transport + ?Sized> SessionValidator<T> {
    /// Create a validator posting to `url`.
    pub fn new(transport: Arc<T>, url: Url) -> Self {
        Self { transport, url }
    }

    /// Returns the validation endpoint URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Validate a credential.
    ///
    /// One POST with the credential in the JSON body and no auth headers.
    ///
    /// # Errors
    ///
    /// Any transport failure, non-2xx status, unparsable body, or a session
    /// id that is missing or cannot be sent as a header value. Callers are
    /// expected to fall back to the raw credential.
    #[instrument(skip(self, credential), fields(url = %self.url))]
    pub async fn validate(&self, credential: &AccessToken) -> Result<Session> {
        let payload = serde_json::to_vec(&ValidateSessionRequest {
            token: credential.as_str(),
        })
        .map_err(|e| InvalidInputError::Body {
            reason: e.to_string(),
        })?;

        let response = self
            .transport
            .send(OutgoingRequest::json_post(
                self.url.clone(),
                Bytes::from(payload),
            ))
            .await?;

        if !response.status.is_success() {
            return Err(Error::Protocol(protocol_error(&response)));
        }

        let body: ValidateSessionResponse =
            serde_json::from_slice(&response.body).map_err(|e| AuthError::SessionUnavailable {
                reason: format!("unparsable response: {}", e),
            })?;

        let id = match body.session_id {
            Some(id) if !id.is_empty() => id,
            _ => {
                return Err(AuthError::SessionUnavailable {
                    reason: "response carried no session id".to_string(),
                }
                .into());
            }
        };

        if HeaderValue::from_str(&id).is_err() {
            return Err(AuthError::SessionUnavailable {
                reason: "session id is not a valid header value".to_string(),
            }
            .into());
        }

        debug!("Session validated");
        Ok(Session::new(id))
    }
}

impl<T: ?Sized> Clone for SessionValidator<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            url: self.url.clone(),
        }
    }
}
