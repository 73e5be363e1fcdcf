//! Auth header construction.
//!
//! The backend accepts two historical conventions for the authorization
//! header, `Bearer <credential>` and the bare credential, and there is no
//! reliable way to tell in advance which one an endpoint wants. Every call
//! site therefore has to be able to produce both from the same credential.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};

use crate::error::InvalidInputError;

/// Scheme token used by the prefixed variant.
pub const AUTH_SCHEME: &str = "Bearer";

/// Header that duplicates the effective credential for session-aware endpoints.
pub const SESSION_HEADER: &str = "x-session-id";

/// Which authorization convention to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderVariant {
    /// `Authorization: Bearer <credential>`
    Prefixed,
    /// `Authorization: <credential>`
    Raw,
}

impl HeaderVariant {
    /// Label for log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderVariant::Prefixed => "prefixed",
            HeaderVariant::Raw => "raw",
        }
    }
}

/// Options for [`build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderOptions {
    pub use_prefix: bool,
    pub include_session_id: bool,
}

impl From<HeaderVariant> for HeaderOptions {
    fn from(variant: HeaderVariant) -> Self {
        Self {
            use_prefix: variant == HeaderVariant::Prefixed,
            include_session_id: true,
        }
    }
}

/// Build the auth headers for a credential.
///
/// # Errors
///
/// Fails only when the credential contains bytes that are not valid in a
/// header value.
pub fn build(credential: &str, opts: HeaderOptions) -> Result<HeaderMap, InvalidInputError> {
    let auth = if opts.use_prefix {
        format!("{} {}", AUTH_SCHEME, credential)
    } else {
        credential.to_string()
    };

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, sensitive_value(AUTHORIZATION.as_str(), &auth)?);

    if opts.include_session_id {
        headers.insert(
            HeaderName::from_static(SESSION_HEADER),
            sensitive_value(SESSION_HEADER, credential)?,
        );
    }

    Ok(headers)
}

/// Overlay caller headers on generated ones.
///
/// Every name present in `caller` replaces all generated values for that
/// name; names only present in `generated` are kept.
pub fn merge(mut generated: HeaderMap, caller: &HeaderMap) -> HeaderMap {
    for name in caller.keys() {
        generated.remove(name);
    }
    for (name, value) in caller.iter() {
        generated.append(name.clone(), value.clone());
    }
    generated
}

fn sensitive_value(name: &str, value: &str) -> Result<HeaderValue, InvalidInputError> {
    let mut value = HeaderValue::from_str(value).map_err(|e| InvalidInputError::Header {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    value.set_sensitive(true);
    Ok(value)
}
