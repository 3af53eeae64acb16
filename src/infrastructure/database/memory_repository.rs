//! In-process users and credentials for development and tests.

use anyhow::{bail, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::{CredentialRecord, CredentialRecordStore, User, UserDirectory};

#[derive(Default)]
pub struct MemoryRepository {
    // ---
    users: DashMap<String, User>,
    credentials: DashMap<Vec<u8>, CredentialRecord>,
}

impl MemoryRepository {
    // ---
    pub fn new() -> Self {
        // ---
        Self::default()
    }

    pub fn credential_count(&self) -> usize {
        // ---
        self.credentials.len()
    }
}

#[async_trait::async_trait]
impl UserDirectory for MemoryRepository {
    // ---
    async fn lookup(&self, username: &str) -> Result<Option<User>> {
        // ---
        Ok(self.users.get(username).map(|user| user.clone()))
    }

    async fn create_user(&self, username: &str, display_name: &str) -> Result<User> {
        // ---
        match self.users.entry(username.to_string()) {
            Entry::Occupied(_) => bail!("username {username:?} is already taken"),
            Entry::Vacant(slot) => {
                let user = User::new(username.to_string(), display_name.to_string());
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }
}

#[async_trait::async_trait]
impl CredentialRecordStore for MemoryRepository {
    // ---
    async fn create(&self, record: CredentialRecord) -> Result<()> {
        // ---
        match self.credentials.entry(record.id.clone()) {
            Entry::Occupied(_) => bail!("credential {} already exists", record.id_hex()),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, credential_id: &[u8]) -> Result<Option<CredentialRecord>> {
        // ---
        Ok(self
            .credentials
            .get(credential_id)
            .map(|record| record.clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Vec<CredentialRecord>> {
        // ---
        let mut records: Vec<CredentialRecord> = self
            .credentials
            .iter()
            .filter(|record| record.username == username)
            .map(|record| record.clone())
            .collect();
        records.sort_by_key(|record| record.created_at);
        Ok(records)
    }

    async fn update(&self, record: CredentialRecord) -> Result<()> {
        // ---
        match self.credentials.get_mut(&record.id) {
            Some(mut existing) => {
                existing.public_key = record.public_key;
                existing.counter = record.counter;
                existing.last_used_at = record.last_used_at;
                Ok(())
            }
            None => bail!("credential {} does not exist", record.id_hex()),
        }
    }
}
