use super::error::CeremonyError;
use super::webauthn_models::User;
use std::sync::Arc;

/// Decides what happens when an attestation result names a user the directory does
/// not know.
///
/// Returning a [`User`] lets the ceremony continue for that user; returning an error
/// ends it.
#[async_trait::async_trait]
pub trait UsernameNotFoundHandler: Send + Sync {
    // ---
    async fn on_username_not_found(&self, username: &str) -> Result<User, CeremonyError>;
}

/// Type alias for any implementation of UsernameNotFoundHandler.
pub type UsernameNotFoundHandlerPtr = Arc<dyn UsernameNotFoundHandler>;
