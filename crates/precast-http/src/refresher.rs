//! Token refresh with a single in-flight guard.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

use precast_core::error::RefreshError;
use precast_core::traits::{CredentialStore, OutgoingRequest, Transport};
use precast_core::{AccessToken, CredentialPair, RefreshToken};

use crate::endpoints::{RefreshTokenRequest, RefreshTokenResponse};

type SharedRefresh = Shared<BoxFuture<'static, Result<AccessToken, RefreshError>>>;

/// Tokens issued by one refresh exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: AccessToken,
    /// Present when the server rotated the refresh token.
    pub refresh_token: Option<RefreshToken>,
}

#[derive(Default)]
struct InFlight {
    next_generation: u64,
    current: Option<(u64, SharedRefresh)>,
}

/// Network exchange plus persistence, shared with the spawned refresh task.
struct Exchanger<T, S> {
    transport: Arc<T>,
    store: Arc<S>,
    url: Url,
}

impl<T, S> Clone for Exchanger<T, S> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            store: Arc::clone(&self.store),
            url: self.url.clone(),
        }
    }
}

impl<T: Transport, S: CredentialStore> Exchanger<T, S> {
    async fn exchange(&self, refresh_token: &RefreshToken) -> Result<TokenGrant, RefreshError> {
        let payload = serde_json::to_vec(&RefreshTokenRequest {
            refresh_token: refresh_token.as_str(),
        })
        .map_err(|e| RefreshError::InvalidResponse {
            message: e.to_string(),
        })?;

        let response = self
            .transport
            .send(OutgoingRequest::json_post(
                self.url.clone(),
                Bytes::from(payload),
            ))
            .await
            .map_err(|e| RefreshError::Transport {
                message: e.to_string(),
            })?;

        if !response.status.is_success() {
            return Err(RefreshError::Rejected {
                status: response.status.as_u16(),
            });
        }

        let body: RefreshTokenResponse =
            serde_json::from_slice(&response.body).map_err(|e| RefreshError::InvalidResponse {
                message: e.to_string(),
            })?;

        let access_token = match body.access_token {
            Some(token) if !token.is_empty() => AccessToken::new(token),
            _ => {
                return Err(RefreshError::InvalidResponse {
                    message: "response carried no access token".to_string(),
                });
            }
        };

        Ok(TokenGrant {
            access_token,
            refresh_token: body
                .refresh_token
                .filter(|t| !t.is_empty())
                .map(RefreshToken::new),
        })
    }

    async fn exchange_and_persist(
        &self,
        current: CredentialPair,
        refresh_token: RefreshToken,
    ) -> Result<AccessToken, RefreshError> {
        let grant = self.exchange(&refresh_token).await?;
        let rotated = grant.refresh_token.is_some();
        let pair = current.rotated(grant.access_token, grant.refresh_token);
        let access_token = pair.access_token.clone();

        self.store
            .set(pair)
            .await
            .map_err(|e| RefreshError::Store {
                message: e.to_string(),
            })?;

        info!(rotated, "Refreshed access token");
        Ok(access_token)
    }
}

/// Exchanges the stored refresh token for a new access token.
///
/// Concurrent callers share one exchange: the first one starts it, the rest
/// wait on the same result. The exchange runs in its own task, so dropping
/// a waiting caller never cancels it halfway.
pub struct TokenRefresher<T, S> {
    exchanger: Exchanger<T, S>,
    in_flight: Arc<Mutex<InFlight>>,
}

impl<T, S> Clone for TokenRefresher<T, S> {
    fn clone(&self) -> Self {
        Self {
            exchanger: self.exchanger.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<T, S> TokenRefresher<T, S>
where
    T: Transport + 'static,
    S: CredentialStore + 'static,
{
    /// Create a refresher posting to `url` and persisting into `store`.
    pub fn new(transport: Arc<T>, store: Arc<S>, url: Url) -> Self {
        Self {
            exchanger: Exchanger {
                transport,
                store,
                url,
            },
            in_flight: Arc::new(Mutex::new(InFlight::default())),
        }
    }

    /// One refresh call, without persistence or deduplication.
    #[instrument(skip(self, refresh_token), fields(url = %self.exchanger.url))]
    pub async fn exchange(&self, refresh_token: &RefreshToken) -> Result<TokenGrant, RefreshError> {
        self.exchanger.exchange(refresh_token).await
    }

    /// Obtain a fresh access token after `rejected` was refused.
    ///
    /// If the store already holds a different access token, another
    /// operation refreshed in the meantime and that token is returned
    /// without a network call. Otherwise the stored refresh token is
    /// exchanged and the new pair persisted before this returns. Only the
    /// access token of `rejected` is consulted; the refresh token always
    /// comes from the store.
    ///
    /// # Errors
    ///
    /// [`RefreshError`] when the store holds no refresh token or the
    /// exchange or persistence fails. The same error reaches every waiter.
    #[instrument(skip(self, rejected))]
    pub async fn refresh(&self, rejected: &CredentialPair) -> Result<AccessToken, RefreshError> {
        let shared = {
            let mut slot = self.in_flight.lock().await;

            let joinable = slot
                .current
                .as_ref()
                .filter(|(_, pending)| pending.peek().is_none())
                .map(|(generation, pending)| (*generation, pending.clone()));

            if let Some((generation, pending)) = joinable {
                debug!(generation, "Joining in-flight refresh");
                pending
            } else {
                let current = self.current_pair().await?;
                if current.access_token != rejected.access_token {
                    debug!("Access token already refreshed");
                    return Ok(current.access_token);
                }
                let refresh_token = current
                    .refresh_token
                    .clone()
                    .ok_or(RefreshError::NoRefreshToken)?;

                let generation = slot.next_generation;
                slot.next_generation += 1;
                let pending = self.spawn_refresh(generation, current, refresh_token);
                slot.current = Some((generation, pending.clone()));
                debug!(generation, "Started refresh");
                pending
            }
        };

        shared.await
    }

    async fn current_pair(&self) -> Result<CredentialPair, RefreshError> {
        self.exchanger
            .store
            .get()
            .await
            .map_err(|e| RefreshError::Store {
                message: e.to_string(),
            })?
            .ok_or(RefreshError::NoRefreshToken)
    }

    fn spawn_refresh(
        &self,
        generation: u64,
        current: CredentialPair,
        refresh_token: RefreshToken,
    ) -> SharedRefresh {
        let exchanger = self.exchanger.clone();
        let in_flight = Arc::clone(&self.in_flight);

        let handle = tokio::spawn(async move {
            let result = exchanger.exchange_and_persist(current, refresh_token).await;
            if let Err(ref e) = result {
                warn!(error = %e, "Token refresh failed");
            }

            let mut slot = in_flight.lock().await;
            if matches!(slot.current, Some((g, _)) if g == generation) {
                slot.current = None;
            }
            result
        });

        async move {
            handle.await.unwrap_or_else(|e| {
                warn!(error = %e, "Refresh task did not complete");
                Err(RefreshError::Aborted)
            })
        }
        .boxed()
        .shared()
    }
}
