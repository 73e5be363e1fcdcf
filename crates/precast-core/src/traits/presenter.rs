//! Outcome presenter trait.

use async_trait::async_trait;

use crate::outcome::OperationOutcome;

/// Turns terminal outcomes into user-visible behavior.
///
/// Receives the outcome together with the message the caller intended to
/// show for this operation (e.g. "Could not save the pour record").
/// Implementations alert, force a logout, or stay silent; nothing is
/// returned to the caller.
#[async_trait]
pub trait OutcomePresenter: Send + Sync {
    async fn present(&self, outcome: &OperationOutcome, intended_message: &str);
}
