//! Ceremony options as produced by the relying-party policy.
//!
//! These types double as the JSON bodies of the two options endpoints, so field
//! names follow the WebAuthn dictionaries (`camelCase`) and optional members are
//! skipped rather than sent as `null`.

use super::challenge::{Challenge, UserVerificationRequirement};
use super::webauthn_models::{CredentialRecord, User};
use anyhow::Result;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use std::sync::Arc;

/// Only credential type defined by WebAuthn.
pub const PUBLIC_KEY_CREDENTIAL_TYPE: &str = "public-key";

/// Client extension inputs, kept as free-form JSON.
pub type ExtensionInputs = Map<String, Value>;

/// Overlay `overrides` on top of `defaults`; keys present in `overrides` win.
pub fn merge_extensions(
    defaults: Option<ExtensionInputs>,
    overrides: Option<ExtensionInputs>,
) -> Option<ExtensionInputs> {
    // ---
    match (defaults, overrides) {
        (None, None) => None,
        (Some(defaults), None) => Some(defaults),
        (None, Some(overrides)) => Some(overrides),
        (Some(mut merged), Some(overrides)) => {
            merged.extend(overrides);
            Some(merged)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelyingPartyEntity {
    // ---
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    // ---
    /// base64url user handle
    pub id: String,
    pub name: String,
    pub display_name: String,
}

impl From<&User> for UserEntity {
    fn from(user: &User) -> Self {
        Self {
            id: URL_SAFE_NO_PAD.encode(user.handle()),
            name: user.username.clone(),
            display_name: user.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PubKeyCredParam {
    // ---
    #[serde(rename = "type")]
    pub credential_type: String,
    /// COSE algorithm identifier
    pub alg: i64,
}

impl PubKeyCredParam {
    // ---
    pub fn public_key(alg: i64) -> Self {
        // ---
        Self {
            credential_type: PUBLIC_KEY_CREDENTIAL_TYPE.to_string(),
            alg,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    // ---
    #[serde(rename = "type")]
    pub credential_type: String,
    /// base64url credential id
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<String>>,
}

impl From<&CredentialRecord> for CredentialDescriptor {
    fn from(record: &CredentialRecord) -> Self {
        Self {
            credential_type: PUBLIC_KEY_CREDENTIAL_TYPE.to_string(),
            id: URL_SAFE_NO_PAD.encode(&record.id),
            transports: (!record.transports.is_empty()).then(|| record.transports.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelectionCriteria {
    // ---
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resident_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_resident_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<UserVerificationRequirement>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttestationConveyancePreference {
    #[default]
    None,
    Indirect,
    Direct,
    Enterprise,
}

impl FromStr for AttestationConveyancePreference {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "none" => Ok(Self::None),
            "indirect" => Ok(Self::Indirect),
            "direct" => Ok(Self::Direct),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(anyhow::anyhow!("unknown attestation preference: {other}")),
        }
    }
}

/// `PublicKeyCredentialCreationOptions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationOptions {
    // ---
    pub rp: RelyingPartyEntity,
    pub user: UserEntity,
    pub challenge: Challenge,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_credentials: Option<Vec<CredentialDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_selection: Option<AuthenticatorSelectionCriteria>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<AttestationConveyancePreference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<ExtensionInputs>,
}

impl AttestationOptions {
    // ---
    /// Requirement the client is asked for; `preferred` when unspecified.
    pub fn user_verification(&self) -> UserVerificationRequirement {
        // ---
        self.authenticator_selection
            .as_ref()
            .and_then(|selection| selection.user_verification)
            .unwrap_or_default()
    }
}

/// `PublicKeyCredentialRequestOptions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionOptions {
    // ---
    pub challenge: Challenge,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_credentials: Option<Vec<CredentialDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<UserVerificationRequirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<ExtensionInputs>,
}

/// Relying-party policy for registration options.
///
/// Implementations generate the random challenge; the endpoint then embeds ceremony
/// metadata into it.
#[async_trait::async_trait]
pub trait AttestationOptionsProvider: Send + Sync {
    // ---
    async fn provide(&self, user: &User) -> Result<AttestationOptions>;
}

/// Relying-party policy for authentication options.
///
/// `username` is absent for discoverable-credential flows, in which case the allow list
/// is empty.
#[async_trait::async_trait]
pub trait AssertionOptionsProvider: Send + Sync {
    // ---
    async fn provide(&self, username: Option<&str>) -> Result<AssertionOptions>;
}

pub type AttestationOptionsProviderPtr = Arc<dyn AttestationOptionsProvider>;
pub type AssertionOptionsProviderPtr = Arc<dyn AssertionOptionsProvider>;
