//! Traits at the seams of the orchestrator.

mod credential_store;
mod presenter;
mod transport;

pub use credential_store::CredentialStore;
pub use presenter::OutcomePresenter;
pub use transport::{OutgoingRequest, RawResponse, Transport};
