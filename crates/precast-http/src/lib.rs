//! precast-http - Authenticated request orchestration over HTTP.
//!
//! The [`RequestOrchestrator`] is the entry point: hand it an
//! [`OperationRequest`](precast_core::OperationRequest) and it takes care of
//! session validation, the two authorization header conventions, token
//! refresh and replay, returning a single
//! [`OperationOutcome`](precast_core::OperationOutcome).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use precast_core::{ApiUrl, CredentialPair, OperationRequest};
//! use precast_http::{ClientConfig, RequestOrchestrator};
//! use precast_store::MemoryCredentialStore;
//!
//! # async fn example() -> Result<(), precast_core::Error> {
//! let config = ClientConfig::new(ApiUrl::new("https://api.example.com")?);
//! let store = Arc::new(MemoryCredentialStore::init(CredentialPair::new(
//!     "access",
//!     Some("refresh".to_string()),
//! )));
//! let orchestrator = RequestOrchestrator::http(&config, store)?;
//!
//! let request = OperationRequest::get(config.api_url.endpoint("/elements")?);
//! let outcome = orchestrator.execute(&request).await;
//! println!("{:?}", outcome.status());
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod endpoints;
mod orchestrator;
mod refresher;
mod validator;

pub use client::HttpTransport;
pub use config::ClientConfig;
pub use endpoints::{REFRESH_TOKEN, VALIDATE_SESSION};
pub use orchestrator::RequestOrchestrator;
pub use refresher::{TokenGrant, TokenRefresher};
pub use validator::SessionValidator;
