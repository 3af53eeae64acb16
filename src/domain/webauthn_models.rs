use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for user handles derived from usernames.
const USER_HANDLE_NAMESPACE: Uuid = Uuid::from_u128(0x6f1d_2c4e_8a3b_4f71_9e05_b7c2_d410_a9e3);

/// Represents a user in the WebAuthn system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    // ---
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    // ---
    /// The id is derived from the username, so a user entity handed out in
    /// creation options carries the same handle the user is later stored with.
    pub fn new(username: String, display_name: String) -> Self {
        // ---
        Self {
            id: Uuid::new_v5(&USER_HANDLE_NAMESPACE, username.as_bytes()),
            username,
            display_name,
            created_at: Utc::now(),
        }
    }

    /// User handle as sent to authenticators (`user.id` in creation options).
    pub fn handle(&self) -> &[u8] {
        // ---
        self.id.as_bytes()
    }
}

/// A verified WebAuthn credential bound to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    // ---
    /// Unique credential ID (from authenticator)
    pub id: Vec<u8>,

    /// User this credential belongs to
    pub user_id: Uuid,

    /// Username of the owner, denormalised for allow-list lookups
    pub username: String,

    /// Credential material as produced by the verifier (opaque to the core)
    pub public_key: Vec<u8>,

    /// Signature counter (for cloned-authenticator detection)
    pub counter: u32,

    /// Transports reported by the client at registration time
    pub transports: Vec<String>,

    /// Attestation statement format (`none`, `packed`, ...)
    pub attestation_format: String,

    /// Authenticator model identifier
    pub aaguid: Uuid,

    /// When this credential was created
    pub created_at: DateTime<Utc>,

    /// Last successful assertion
    pub last_used_at: Option<DateTime<Utc>>,
}

impl CredentialRecord {
    // ---
    pub fn new(id: Vec<u8>, user: &User, public_key: Vec<u8>, counter: u32) -> Self {
        // ---
        Self {
            id,
            user_id: user.id,
            username: user.username.clone(),
            public_key,
            counter,
            transports: Vec::new(),
            attestation_format: "none".to_string(),
            aaguid: Uuid::nil(),
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    pub fn with_transports(mut self, transports: Vec<String>) -> Self {
        // ---
        self.transports = transports;
        self
    }

    pub fn with_attestation(mut self, format: impl Into<String>, aaguid: Uuid) -> Self {
        // ---
        self.attestation_format = format.into();
        self.aaguid = aaguid;
        self
    }

    /// Hex form of the credential id, for logs.
    pub fn id_hex(&self) -> String {
        // ---
        hex::encode(&self.id)
    }
}
