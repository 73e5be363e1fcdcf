//! Validated domain types.

mod api_url;
mod session;

pub use api_url::ApiUrl;
pub use session::{EffectiveCredential, Session};
