//! The authenticated request protocol.
//!
//! One [`RequestOrchestrator::execute`] call runs, at most:
//!
//! ```text
//! validate ─ A (prefixed) ─401─ B (raw) ─401─ refresh ─ validate ─ C (prefixed) ─401─ D (raw)
//! ```
//!
//! Any non-401 response ends the operation as `Success`; transport errors
//! end it as `TransportFailure`; running out of options ends it as
//! `AuthFailure`.

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, info, instrument, warn};

use precast_core::error::RefreshError;
use precast_core::headers::{self, HeaderVariant};
use precast_core::traits::{CredentialStore, OutgoingRequest, Transport};
use precast_core::{
    AccessToken, AuthFailureReason, EffectiveCredential, OperationOutcome, OperationRequest,
    Result,
};

use crate::client::HttpTransport;
use crate::config::ClientConfig;
use crate::refresher::TokenRefresher;
use crate::validator::SessionValidator;

enum Attempt {
    Completed(OperationOutcome),
    Unauthorized,
}

/// Executes operations against the API on behalf of the stored credentials.
///
/// Cheap to clone; clones share the transport, the store and the refresh
/// guard, so concurrent operations refresh at most once between them.
pub struct RequestOrchestrator<T, S> {
    transport: Arc<T>,
    store: Arc<S>,
    validator: SessionValidator<T>,
    refresher: TokenRefresher<T, S>,
}

impl<T, S> Clone for RequestOrchestrator<T, S> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            store: Arc::clone(&self.store),
            validator: self.validator.clone(),
            refresher: self.refresher.clone(),
        }
    }
}

impl<S: CredentialStore + 'static> RequestOrchestrator<HttpTransport, S> {
    /// Orchestrator over a fresh reqwest transport.
    pub fn http(config: &ClientConfig, store: Arc<S>) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config)?);
        Self::new(transport, store, config)
    }
}

impl<T, S> RequestOrchestrator<T, S>
where
    T: Transport + 'static,
    S: CredentialStore + 'static,
{
    /// Wire an orchestrator from its parts.
    pub fn new(transport: Arc<T>, store: Arc<S>, config: &ClientConfig) -> Result<Self> {
        let validator = SessionValidator::new(Arc::clone(&transport), config.validate_url()?);
        let refresher = TokenRefresher::new(
            Arc::clone(&transport),
            Arc::clone(&store),
            config.refresh_url()?,
        );

        Ok(Self {
            transport,
            store,
            validator,
            refresher,
        })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn validator(&self) -> &SessionValidator<T> {
        &self.validator
    }

    pub fn refresher(&self) -> &TokenRefresher<T, S> {
        &self.refresher
    }

    /// Run one operation to a terminal outcome.
    ///
    /// Never fails: every error is folded into the returned
    /// [`OperationOutcome`]. The stored credentials change only when a
    /// refresh succeeds.
    #[instrument(skip(self, request), fields(method = %request.method(), url = %request.url()))]
    pub async fn execute(&self, request: &OperationRequest) -> OperationOutcome {
        let pair = match self.store.get().await {
            Ok(Some(pair)) if !pair.access_token.as_str().is_empty() => pair,
            Ok(_) => {
                debug!("No stored access token");
                return OperationOutcome::no_credential();
            }
            Err(e) => {
                warn!(error = %e, "Credential store unavailable");
                return OperationOutcome::auth_failure(None, AuthFailureReason::StoreUnavailable);
            }
        };

        let credential = self.effective_credential(&pair.access_token).await;
        if let Attempt::Completed(outcome) = self
            .attempt_both(request, &credential, None, ["A", "B"])
            .await
        {
            return outcome;
        }

        let access_token = match self.refresher.refresh(&pair).await {
            Ok(token) => token,
            Err(RefreshError::NoRefreshToken) => {
                warn!("Credentials rejected and no refresh token stored");
                return OperationOutcome::unauthorized(AuthFailureReason::NoRefreshToken);
            }
            Err(e) => {
                warn!(error = %e, "Credentials rejected and refresh failed");
                return OperationOutcome::unauthorized(AuthFailureReason::RefreshFailed);
            }
        };

        let credential = self.effective_credential(&access_token).await;
        match self
            .attempt_both(
                request,
                &credential,
                Some(StatusCode::UNAUTHORIZED),
                ["C", "D"],
            )
            .await
        {
            Attempt::Completed(outcome) => outcome,
            Attempt::Unauthorized => {
                warn!("Refreshed credentials rejected");
                OperationOutcome::unauthorized(AuthFailureReason::Rejected)
            }
        }
    }

    async fn effective_credential(&self, token: &AccessToken) -> EffectiveCredential {
        match self.validator.validate(token).await {
            Ok(session) => EffectiveCredential::Session(session),
            Err(e) => {
                warn!(error = %e, "Session validation failed, using access token");
                EffectiveCredential::Access(token.clone())
            }
        }
    }

    /// Prefixed then raw, stopping at the first non-401.
    async fn attempt_both(
        &self,
        request: &OperationRequest,
        credential: &EffectiveCredential,
        last_status: Option<StatusCode>,
        labels: [&'static str; 2],
    ) -> Attempt {
        let [first, second] = labels;
        match self
            .attempt(request, credential, HeaderVariant::Prefixed, first, last_status)
            .await
        {
            Attempt::Unauthorized => {}
            completed => return completed,
        }
        self.attempt(
            request,
            credential,
            HeaderVariant::Raw,
            second,
            Some(StatusCode::UNAUTHORIZED),
        )
        .await
    }

    async fn attempt(
        &self,
        request: &OperationRequest,
        credential: &EffectiveCredential,
        variant: HeaderVariant,
        label: &'static str,
        last_status: Option<StatusCode>,
    ) -> Attempt {
        let auth = match headers::build(credential.as_str(), variant.into()) {
            Ok(auth) => auth,
            Err(e) => {
                warn!(error = %e, "Credential cannot be sent as a header");
                return Attempt::Completed(OperationOutcome::auth_failure(
                    last_status,
                    AuthFailureReason::MalformedCredential,
                ));
            }
        };

        let outgoing = OutgoingRequest {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: headers::merge(with_content_type(auth, request), request.headers()),
            body: request.body().map(|body| body.bytes().clone()),
        };

        debug!(
            attempt = label,
            variant = variant.as_str(),
            credential = credential.kind(),
            "Sending attempt"
        );

        match self.transport.send(outgoing).await {
            Ok(response) if response.status == StatusCode::UNAUTHORIZED => {
                info!(attempt = label, "Attempt unauthorized");
                Attempt::Unauthorized
            }
            Ok(response) => {
                debug!(attempt = label, status = %response.status, "Attempt completed");
                Attempt::Completed(OperationOutcome::Success {
                    status: response.status,
                    headers: response.headers,
                    body: response.body,
                })
            }
            Err(cause) => {
                warn!(attempt = label, error = %cause, "Attempt failed in transport");
                Attempt::Completed(OperationOutcome::TransportFailure { cause })
            }
        }
    }
}

fn with_content_type(mut generated: HeaderMap, request: &OperationRequest) -> HeaderMap {
    if let Some(body) = request.body() {
        if let Ok(value) = HeaderValue::from_str(body.content_type()) {
            generated.insert(CONTENT_TYPE, value);
        }
    }
    generated
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures_util::future::join_all;
    use precast_core::error::TransportError;
    use precast_core::traits::RawResponse;
    use precast_core::{ApiUrl, CredentialPair, MultipartForm};
    use precast_store::MemoryCredentialStore;
    use reqwest::header::AUTHORIZATION;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    enum Reply {
        Status(u16, &'static str),
        Unreachable,
    }

    /// Answers auth endpoints and business calls from queues, recording
    /// every request and the stored access token at each business send.
    #[derive(Default)]
    struct Scripted {
        validate: Mutex<VecDeque<Reply>>,
        refresh: Mutex<VecDeque<Reply>>,
        business: Mutex<VecDeque<Reply>>,
        log: Mutex<Vec<OutgoingRequest>>,
        store: Mutex<Option<Arc<MemoryCredentialStore>>>,
        stored_at_send: Mutex<Vec<Option<String>>>,
    }

    impl Scripted {
        fn calls_to(&self, path: &str) -> Vec<OutgoingRequest> {
            self.log
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.url.path() == path)
                .cloned()
                .collect()
        }

        fn business_calls(&self) -> Vec<OutgoingRequest> {
            self.calls_to("/elements")
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(
            &self,
            request: OutgoingRequest,
        ) -> std::result::Result<RawResponse, TransportError> {
            self.log.lock().unwrap().push(request.clone());

            let queue = match request.url.path() {
                "/validate-session" => &self.validate,
                "/refresh-token" => &self.refresh,
                _ => {
                    let store = self.store.lock().unwrap().clone();
                    if let Some(store) = store {
                        let stored = store.get().await.unwrap();
                        self.stored_at_send
                            .lock()
                            .unwrap()
                            .push(stored.map(|p| p.access_token.as_str().to_string()));
                    }
                    &self.business
                }
            };

            let reply = queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Reply::Status(500, "{}"));
            match reply {
                Reply::Status(status, body) => Ok(RawResponse {
                    status: StatusCode::from_u16(status).unwrap(),
                    headers: HeaderMap::new(),
                    body: Bytes::from_static(body.as_bytes()),
                }),
                Reply::Unreachable => Err(TransportError::Connection {
                    message: "connection refused".to_string(),
                }),
            }
        }
    }

    struct Harness {
        transport: Arc<Scripted>,
        store: Arc<MemoryCredentialStore>,
        orchestrator: RequestOrchestrator<Scripted, MemoryCredentialStore>,
    }

    fn config() -> ClientConfig {
        ClientConfig::new(ApiUrl::new("https://api.example.com").unwrap())
    }

    fn harness(pair: Option<CredentialPair>) -> Harness {
        let transport = Arc::new(Scripted::default());
        let store = Arc::new(match pair {
            Some(pair) => MemoryCredentialStore::init(pair),
            None => MemoryCredentialStore::new(),
        });
        *transport.store.lock().unwrap() = Some(Arc::clone(&store));
        let orchestrator =
            RequestOrchestrator::new(Arc::clone(&transport), Arc::clone(&store), &config())
                .unwrap();
        Harness {
            transport,
            store,
            orchestrator,
        }
    }

    fn logged_in() -> Harness {
        harness(Some(CredentialPair::new("T1", Some("R1".to_string()))))
    }

    fn script(queue: &Mutex<VecDeque<Reply>>, replies: impl IntoIterator<Item = Reply>) {
        queue.lock().unwrap().extend(replies);
    }

    fn save_request() -> OperationRequest {
        OperationRequest::post(config().api_url.endpoint("/elements").unwrap())
            .json(&serde_json::json!({"element": "P-104", "status": "poured"}))
            .unwrap()
    }

    #[tokio::test]
    async fn first_attempt_success_uses_session_with_prefix() {
        let h = logged_in();
        script(&h.transport.validate, [Reply::Status(200, r#"{"sessionId":"S1"}"#)]);
        script(&h.transport.business, [Reply::Status(200, r#"{"id":7}"#)]);

        let outcome = h.orchestrator.execute(&save_request()).await;

        assert!(outcome.is_ok());
        assert_eq!(outcome.body().unwrap().as_ref(), br#"{"id":7}"#);
        let calls = h.transport.business_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].headers[AUTHORIZATION], "Bearer S1");
        assert_eq!(calls[0].headers["x-session-id"], "S1");
        assert_eq!(calls[0].headers[CONTENT_TYPE], "application/json");
        assert!(h.transport.calls_to("/refresh-token").is_empty());
    }

    #[tokio::test]
    async fn validation_failure_falls_back_to_access_token() {
        let h = logged_in();
        script(&h.transport.validate, [Reply::Status(503, "")]);
        script(&h.transport.business, [Reply::Status(201, "{}")]);

        let outcome = h.orchestrator.execute(&save_request()).await;

        assert_eq!(outcome.status(), Some(StatusCode::CREATED));
        let calls = h.transport.business_calls();
        assert_eq!(calls[0].headers[AUTHORIZATION], "Bearer T1");
        assert_eq!(calls[0].headers["x-session-id"], "T1");
    }

    #[tokio::test]
    async fn raw_variant_follows_a_prefixed_401() {
        let h = logged_in();
        script(&h.transport.validate, [Reply::Status(200, r#"{"sessionId":"S1"}"#)]);
        script(
            &h.transport.business,
            [Reply::Status(401, "{}"), Reply::Status(200, "{}")],
        );

        let outcome = h.orchestrator.execute(&save_request()).await;

        assert!(outcome.is_ok());
        let calls = h.transport.business_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].headers[AUTHORIZATION], "S1");
        assert!(h.transport.calls_to("/refresh-token").is_empty());
    }

    #[tokio::test]
    async fn refresh_then_replay_with_new_session() {
        let h = logged_in();
        script(
            &h.transport.validate,
            [
                Reply::Status(200, r#"{"sessionId":"S1"}"#),
                Reply::Status(200, r#"{"sessionId":"S2"}"#),
            ],
        );
        script(
            &h.transport.refresh,
            [Reply::Status(200, r#"{"accessToken":"T2","refreshToken":"R2"}"#)],
        );
        script(
            &h.transport.business,
            [
                Reply::Status(401, "{}"),
                Reply::Status(401, "{}"),
                Reply::Status(200, r#"{"saved":true}"#),
            ],
        );

        let outcome = h.orchestrator.execute(&save_request()).await;

        assert!(outcome.is_ok());
        let calls = h.transport.business_calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].headers[AUTHORIZATION], "Bearer S2");
        assert_eq!(h.transport.calls_to("/refresh-token").len(), 1);

        // The new pair was persisted before attempt C went out.
        let stored = h.transport.stored_at_send.lock().unwrap().clone();
        assert_eq!(stored[2].as_deref(), Some("T2"));
        assert_eq!(
            h.store.get().await.unwrap().unwrap(),
            CredentialPair::new("T2", Some("R2".to_string()))
        );

        // Every attempt carried the same bytes.
        let first = calls[0].body.clone().unwrap();
        assert!(calls.iter().all(|c| c.body.as_ref() == Some(&first)));
    }

    #[tokio::test]
    async fn all_variants_rejected_after_refresh() {
        let h = logged_in();
        script(
            &h.transport.refresh,
            [Reply::Status(200, r#"{"accessToken":"T2"}"#)],
        );
        script(
            &h.transport.business,
            (0..4).map(|_| Reply::Status(401, "{}")),
        );

        let outcome = h.orchestrator.execute(&save_request()).await;

        assert!(matches!(
            outcome,
            OperationOutcome::AuthFailure {
                last_status: Some(StatusCode::UNAUTHORIZED),
                reason: AuthFailureReason::Rejected,
            }
        ));
        assert_eq!(h.transport.business_calls().len(), 4);
        assert_eq!(h.transport.calls_to("/refresh-token").len(), 1);
        assert_eq!(h.transport.calls_to("/validate-session").len(), 2);
    }

    #[tokio::test]
    async fn missing_refresh_token_fails_without_refresh_call() {
        let h = harness(Some(CredentialPair::new("T1", None)));
        script(
            &h.transport.business,
            [Reply::Status(401, "{}"), Reply::Status(401, "{}")],
        );

        let outcome = h.orchestrator.execute(&save_request()).await;

        assert!(matches!(
            outcome,
            OperationOutcome::AuthFailure {
                reason: AuthFailureReason::NoRefreshToken,
                ..
            }
        ));
        assert!(h.transport.calls_to("/refresh-token").is_empty());
    }

    #[tokio::test]
    async fn refresh_failure_is_terminal() {
        let h = logged_in();
        script(&h.transport.refresh, [Reply::Status(401, "{}")]);
        script(
            &h.transport.business,
            [Reply::Status(401, "{}"), Reply::Status(401, "{}")],
        );

        let outcome = h.orchestrator.execute(&save_request()).await;

        assert!(matches!(
            outcome,
            OperationOutcome::AuthFailure {
                reason: AuthFailureReason::RefreshFailed,
                ..
            }
        ));
        assert_eq!(h.transport.business_calls().len(), 2);
        assert_eq!(
            h.store.get().await.unwrap().unwrap().access_token.as_str(),
            "T1"
        );
    }

    #[tokio::test]
    async fn server_errors_pass_through_without_retry() {
        let h = logged_in();
        script(&h.transport.business, [Reply::Status(500, r#"{"message":"db down"}"#)]);

        let outcome = h.orchestrator.execute(&save_request()).await;

        assert_eq!(outcome.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(outcome.message().as_deref(), Some("db down"));
        assert_eq!(h.transport.business_calls().len(), 1);
    }

    #[tokio::test]
    async fn transport_failure_stops_immediately() {
        let h = logged_in();
        script(&h.transport.business, [Reply::Unreachable]);

        let outcome = h.orchestrator.execute(&save_request()).await;

        assert!(matches!(outcome, OperationOutcome::TransportFailure { .. }));
        assert_eq!(h.transport.business_calls().len(), 1);
    }

    #[tokio::test]
    async fn logged_out_makes_no_calls() {
        let h = harness(None);

        let outcome = h.orchestrator.execute(&save_request()).await;

        assert!(matches!(
            outcome,
            OperationOutcome::AuthFailure {
                last_status: None,
                reason: AuthFailureReason::NoCredential,
            }
        ));
        assert!(h.transport.log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_access_token_makes_no_calls() {
        let h = harness(Some(CredentialPair::new("", Some("R1".to_string()))));

        let outcome = h.orchestrator.execute(&save_request()).await;

        assert!(matches!(
            outcome,
            OperationOutcome::AuthFailure {
                last_status: None,
                reason: AuthFailureReason::NoCredential,
            }
        ));
        assert!(h.transport.log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsendable_session_id_falls_back_to_access_token() {
        let h = logged_in();
        script(
            &h.transport.validate,
            [Reply::Status(200, r#"{"sessionId":"S1\u0001x"}"#)],
        );
        script(&h.transport.business, [Reply::Status(200, "{}")]);

        let outcome = h.orchestrator.execute(&save_request()).await;

        assert!(outcome.is_ok());
        let calls = h.transport.business_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].headers[AUTHORIZATION], "Bearer T1");
        assert_eq!(calls[0].headers["x-session-id"], "T1");
    }

    #[tokio::test]
    async fn each_operation_validates_its_own_session() {
        let h = logged_in();
        script(
            &h.transport.validate,
            [
                Reply::Status(200, r#"{"sessionId":"S1"}"#),
                Reply::Status(200, r#"{"sessionId":"S2"}"#),
            ],
        );
        script(
            &h.transport.business,
            [Reply::Status(200, "{}"), Reply::Status(200, "{}")],
        );

        assert!(h.orchestrator.execute(&save_request()).await.is_ok());
        assert!(h.orchestrator.execute(&save_request()).await.is_ok());

        assert_eq!(h.transport.calls_to("/validate-session").len(), 2);
        let calls = h.transport.business_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].headers[AUTHORIZATION], "Bearer S1");
        assert_eq!(calls[1].headers[AUTHORIZATION], "Bearer S2");
        assert_eq!(calls[1].headers["x-session-id"], "S2");
    }

    #[tokio::test]
    async fn malformed_credential_is_an_auth_failure() {
        let h = harness(Some(CredentialPair::new("T1\nX", None)));

        let outcome = h.orchestrator.execute(&save_request()).await;

        assert!(matches!(
            outcome,
            OperationOutcome::AuthFailure {
                last_status: None,
                reason: AuthFailureReason::MalformedCredential,
            }
        ));
        assert!(h.transport.business_calls().is_empty());
    }

    #[tokio::test]
    async fn caller_headers_win_over_generated_ones() {
        let h = logged_in();
        script(&h.transport.business, [Reply::Status(204, "")]);

        let request = save_request()
            .header("content-type", "application/vnd.precast+json")
            .unwrap();
        h.orchestrator.execute(&request).await;

        let calls = h.transport.business_calls();
        assert_eq!(calls[0].headers[CONTENT_TYPE], "application/vnd.precast+json");
        assert_eq!(calls[0].headers.get_all(CONTENT_TYPE).iter().count(), 1);
    }

    #[tokio::test]
    async fn multipart_body_is_identical_across_attempts() {
        let h = logged_in();
        script(
            &h.transport.business,
            [Reply::Status(401, "{}"), Reply::Status(200, "{}")],
        );

        let form = MultipartForm::new()
            .text("element", "P-104")
            .file("photo", "pour.jpg", "image/jpeg", vec![0xff, 0xd8, 0xff]);
        let request = OperationRequest::post(config().api_url.endpoint("/elements").unwrap())
            .multipart(&form)
            .unwrap();
        h.orchestrator.execute(&request).await;

        let calls = h.transport.business_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].body, calls[1].body);
        assert!(
            calls[1].headers[CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("multipart/form-data; boundary=")
        );
    }

    /// Accepts only `T2`, which the refresh endpoint hands out slowly.
    #[derive(Default)]
    struct Gate {
        refreshes: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl Transport for Gate {
        async fn send(
            &self,
            request: OutgoingRequest,
        ) -> std::result::Result<RawResponse, TransportError> {
            let (status, body): (u16, &'static str) = match request.url.path() {
                "/validate-session" => (404, ""),
                "/refresh-token" => {
                    self.refreshes
                        .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    (200, r#"{"accessToken":"T2"}"#)
                }
                _ => {
                    let auth = request.headers[AUTHORIZATION].to_str().unwrap_or("");
                    if auth.ends_with("T2") {
                        (200, "{}")
                    } else {
                        (401, "{}")
                    }
                }
            };
            Ok(RawResponse {
                status: StatusCode::from_u16(status).unwrap(),
                headers: HeaderMap::new(),
                body: Bytes::from_static(body.as_bytes()),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_operations_refresh_once() {
        let transport = Arc::new(Gate::default());
        let store = Arc::new(MemoryCredentialStore::init(CredentialPair::new(
            "T1",
            Some("R1".to_string()),
        )));
        let orchestrator =
            RequestOrchestrator::new(Arc::clone(&transport), store, &config()).unwrap();

        let request = save_request();
        let outcomes = join_all((0..6).map(|_| orchestrator.execute(&request))).await;

        assert!(outcomes.iter().all(|o| o.is_ok()));
        assert_eq!(
            transport
                .refreshes
                .load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }
}
