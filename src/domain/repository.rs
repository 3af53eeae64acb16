use super::webauthn_models::{CredentialRecord, User};
use anyhow::Result;
use std::sync::Arc;

/// Looks up and registers relying-party users.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    // ---
    /// Get user by username.
    async fn lookup(&self, username: &str) -> Result<Option<User>>;

    /// Create a new user. Fails if the username is taken.
    async fn create_user(&self, username: &str, display_name: &str) -> Result<User>;
}

/// Persistence for verified credentials.
#[async_trait::async_trait]
pub trait CredentialRecordStore: Send + Sync {
    // ---
    /// Save a new credential. Fails if the credential id already exists.
    async fn create(&self, record: CredentialRecord) -> Result<()>;

    /// Get a specific credential by its ID.
    async fn find_by_id(&self, credential_id: &[u8]) -> Result<Option<CredentialRecord>>;

    /// Get all credentials registered to a username.
    async fn find_by_username(&self, username: &str) -> Result<Vec<CredentialRecord>>;

    /// Update an existing credential (counter, credential material, last use).
    async fn update(&self, record: CredentialRecord) -> Result<()>;
}

/// Type alias for any backend that implements UserDirectory.
pub type UserDirectoryPtr = Arc<dyn UserDirectory>;

/// Type alias for any backend that implements CredentialRecordStore.
pub type CredentialRecordStorePtr = Arc<dyn CredentialRecordStore>;
