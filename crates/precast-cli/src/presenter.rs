//! Terminal rendering of terminal outcomes.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use precast_core::traits::{CredentialStore, OutcomePresenter};
use precast_core::{OperationOutcome, Verdict, classify};

use crate::output;

/// Prints failures to stderr and logs out when authentication is gone.
pub struct TerminalPresenter<S> {
    store: Arc<S>,
}

impl<S: CredentialStore> TerminalPresenter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

/// The line shown for a verdict, or `None` when there is nothing to say.
fn describe(outcome: &OperationOutcome, verdict: &Verdict, intended: &str) -> Option<String> {
    match verdict {
        Verdict::Ok => None,
        Verdict::ForceLogout => Some(format!("{}: session expired, please log in again", intended)),
        Verdict::Transient => Some(format!(
            "{}: server error ({}), try again later",
            intended,
            outcome
                .status()
                .map(|s| s.as_u16().to_string())
                .unwrap_or_default()
        )),
        Verdict::Business { message } => Some(format!("{}: {}", intended, message)),
        Verdict::Unreachable => Some(match outcome {
            OperationOutcome::TransportFailure { cause } => {
                format!("{}: server unreachable ({})", intended, cause)
            }
            _ => format!("{}: server unreachable", intended),
        }),
    }
}

#[async_trait]
impl<S: CredentialStore> OutcomePresenter for TerminalPresenter<S> {
    async fn present(&self, outcome: &OperationOutcome, intended_message: &str) {
        let verdict = classify(outcome);
        let Some(line) = describe(outcome, &verdict, intended_message) else {
            return;
        };
        output::error(&line);

        if verdict == Verdict::ForceLogout {
            if let OperationOutcome::AuthFailure { reason, .. } = outcome {
                output::hint(&format!("{}; run 'precast auth login'", reason));
            }
            if let Err(e) = self.store.clear().await {
                warn!(error = %e, "Failed to clear credentials");
            }
        }
    }
}
