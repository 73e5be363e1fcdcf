//! Reference policy for turning terminal outcomes into user-visible behavior.

use crate::outcome::OperationOutcome;

/// What the presentation layer should do with an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing to report.
    Ok,
    /// Authentication is gone: clear credentials and send the user to login.
    ForceLogout,
    /// Server-side failure (5xx); the user may retry.
    Transient,
    /// Business rejection (4xx other than 401) with the server's message.
    Business { message: String },
    /// The request never completed; the user may retry.
    Unreachable,
}

/// Classify an outcome.
///
/// Every `AuthFailure` forces a logout, whether the refresh token was
/// missing or rejected.
pub fn classify(outcome: &OperationOutcome) -> Verdict {
    match outcome {
        OperationOutcome::AuthFailure { .. } => Verdict::ForceLogout,
        OperationOutcome::TransportFailure { .. } => Verdict::Unreachable,
        OperationOutcome::Success { status, .. } if status.is_server_error() => Verdict::Transient,
        OperationOutcome::Success { status, .. } if status.is_client_error() => {
            let message = outcome.message().unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
            });
            Verdict::Business { message }
        }
        OperationOutcome::Success { .. } => Verdict::Ok,
    }
}
