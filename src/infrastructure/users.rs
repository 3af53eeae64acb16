//! What to do with a username the directory does not know at attestation result.

use crate::domain::{CeremonyError, User, UserDirectoryPtr, UsernameNotFoundHandler};

/// Ends the ceremony. Clients see the same failure as a bad signature.
#[derive(Debug, Default)]
pub struct RejectUnknownUser;

#[async_trait::async_trait]
impl UsernameNotFoundHandler for RejectUnknownUser {
    // ---
    async fn on_username_not_found(&self, username: &str) -> Result<User, CeremonyError> {
        // ---
        Err(CeremonyError::UnknownUser(username.to_string()))
    }
}

/// Registers the user on the spot, using the username as display name.
pub struct ProvisionUnknownUser {
    users: UserDirectoryPtr,
}

impl ProvisionUnknownUser {
    // ---
    pub fn new(users: UserDirectoryPtr) -> Self {
        // ---
        Self { users }
    }
}

#[async_trait::async_trait]
impl UsernameNotFoundHandler for ProvisionUnknownUser {
    // ---
    async fn on_username_not_found(&self, username: &str) -> Result<User, CeremonyError> {
        // ---
        tracing::info!(username, "Provisioning unknown user");
        match self.users.create_user(username, username).await {
            Ok(user) => Ok(user),
            // A concurrent registration may have created it first.
            Err(err) => match self.users.lookup(username).await? {
                Some(user) => Ok(user),
                None => Err(err.into()),
            },
        }
    }
}
