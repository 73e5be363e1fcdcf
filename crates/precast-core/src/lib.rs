//! precast-core - Core types and traits for authenticated request orchestration.

pub mod classify;
pub mod error;
pub mod headers;
pub mod multipart;
pub mod outcome;
pub mod request;
pub mod tokens;
pub mod traits;
pub mod types;

pub use classify::{Verdict, classify};
pub use error::Error;
pub use headers::{HeaderOptions, HeaderVariant};
pub use multipart::MultipartForm;
pub use outcome::{AuthFailureReason, OperationOutcome};
pub use request::{Body, OperationRequest};
pub use tokens::{AccessToken, CredentialPair, RefreshToken};
pub use traits::{CredentialStore, OutcomePresenter, OutgoingRequest, RawResponse, Transport};
pub use types::{ApiUrl, EffectiveCredential, Session};

pub use reqwest::{Method, StatusCode};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
