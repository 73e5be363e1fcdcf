//! Validated session and the credential used for header construction.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::tokens::AccessToken;

/// A server-issued session identifier.
///
/// Sessions are produced by a successful validation call and live only for
/// the orchestrated operation that obtained them. They are never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    session_id: String,
    obtained_at: DateTime<Utc>,
}

impl Session {
    /// Wrap a session id returned by the validation endpoint.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            obtained_at: Utc::now(),
        }
    }

    /// Returns the session identifier.
    pub fn id(&self) -> &str {
        &self.session_id
    }

    /// When the validation call returned.
    pub fn obtained_at(&self) -> DateTime<Utc> {
        self.obtained_at
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &"[REDACTED]")
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// The credential placed in auth headers for one operation.
#[derive(Debug, Clone)]
pub enum EffectiveCredential {
    /// A session id confirmed by the validation endpoint.
    Session(Session),
    /// The raw access token, used when validation was unavailable.
    Access(AccessToken),
}

impl EffectiveCredential {
    /// Returns the value to encode in headers.
    pub fn as_str(&self) -> &str {
        match self {
            EffectiveCredential::Session(session) => session.id(),
            EffectiveCredential::Access(token) => token.as_str(),
        }
    }

    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            EffectiveCredential::Session(_) => "session",
            EffectiveCredential::Access(_) => "access_token",
        }
    }
}
