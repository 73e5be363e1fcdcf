//! In-memory credential store.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use precast_core::traits::CredentialStore;
use precast_core::{CredentialPair, Result};

/// A credential store that lives as long as the process.
///
/// Suited to tests and to hosts that persist credentials elsewhere and hand
/// them over at login.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    pair: RwLock<Option<CredentialPair>>,
}

impl MemoryCredentialStore {
    /// Create an empty (logged out) store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a pair, as after login.
    pub fn init(pair: CredentialPair) -> Self {
        Self {
            pair: RwLock::new(Some(pair)),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self) -> Result<Option<CredentialPair>> {
        Ok(self.pair.read().await.clone())
    }

    async fn set(&self, pair: CredentialPair) -> Result<()> {
        debug!("Storing credential pair in memory");
        *self.pair.write().await = Some(pair);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        debug!("Clearing in-memory credentials");
        *self.pair.write().await = None;
        Ok(())
    }
}
