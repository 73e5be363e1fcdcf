//! Credential store trait.

use async_trait::async_trait;

use crate::Result;
use crate::tokens::CredentialPair;

/// Persistent home of the access/refresh token pair.
///
/// Implementations must be safe to share between concurrently running
/// operations. The orchestrator reads the pair at the start of every
/// operation and writes it only after a successful refresh.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the stored pair, or `None` when logged out.
    async fn get(&self) -> Result<Option<CredentialPair>>;

    /// Replace the stored pair.
    async fn set(&self, pair: CredentialPair) -> Result<()>;

    /// Remove any stored pair.
    async fn clear(&self) -> Result<()>;
}

#[async_trait]
impl<S: CredentialStore + ?Sized> CredentialStore for std::sync::Arc<S> {
    async fn get(&self) -> Result<Option<CredentialPair>> {
        (**self).get().await
    }

    async fn set(&self, pair: CredentialPair) -> Result<()> {
        (**self).set(pair).await
    }

    async fn clear(&self) -> Result<()> {
        (**self).clear().await
    }
}
