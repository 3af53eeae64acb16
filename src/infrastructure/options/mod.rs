//! Relying-party policy for the options endpoints.

use crate::ceremony::ChallengeCodec;
use crate::config::{CeremonyConfig, WebAuthnConfig};
use crate::domain::{
    AssertionOptions, AssertionOptionsProvider, AttestationOptions, AttestationOptionsProvider,
    AuthenticatorSelectionCriteria, Challenge, CredentialDescriptor, CredentialRecordStorePtr,
    PubKeyCredParam, RelyingPartyEntity, User, UserEntity, UserVerificationRequirement,
};
use anyhow::Result;

/// COSE algorithms offered at registration: ES256, RS256, EdDSA.
pub const DEFAULT_ALGORITHMS: [i64; 3] = [-7, -257, -8];

/// Options built from static configuration plus the credential store.
///
/// Registration excludes the user's existing credentials; authentication
/// allows exactly the named user's credentials, or none for discoverable flows.
pub struct DefaultOptionsProvider {
    rp: RelyingPartyEntity,
    ceremony: CeremonyConfig,
    codec: ChallengeCodec,
    credentials: CredentialRecordStorePtr,
}

impl DefaultOptionsProvider {
    // ---
    pub fn new(
        webauthn: &WebAuthnConfig,
        ceremony: CeremonyConfig,
        codec: ChallengeCodec,
        credentials: CredentialRecordStorePtr,
    ) -> Self {
        // ---
        Self {
            rp: RelyingPartyEntity {
                id: webauthn.rp_id.clone(),
                name: webauthn.rp_name.clone(),
            },
            ceremony,
            codec,
            credentials,
        }
    }

    fn timeout_ms(&self) -> Option<u64> {
        // ---
        u64::try_from(self.ceremony.timeout.as_millis()).ok()
    }

    async fn descriptors(&self, username: &str) -> Result<Vec<CredentialDescriptor>> {
        // ---
        let records = self.credentials.find_by_username(username).await?;
        Ok(records.iter().map(CredentialDescriptor::from).collect())
    }
}

#[async_trait::async_trait]
impl AttestationOptionsProvider for DefaultOptionsProvider {
    // ---
    async fn provide(&self, user: &User) -> Result<AttestationOptions> {
        // ---
        let existing = self.descriptors(&user.username).await?;

        Ok(AttestationOptions {
            rp: self.rp.clone(),
            user: UserEntity::from(user),
            challenge: Challenge::new(self.codec.random_bytes()),
            pub_key_cred_params: DEFAULT_ALGORITHMS
                .into_iter()
                .map(PubKeyCredParam::public_key)
                .collect(),
            timeout: self.timeout_ms(),
            exclude_credentials: Some(existing),
            authenticator_selection: Some(AuthenticatorSelectionCriteria {
                user_verification: Some(UserVerificationRequirement::Preferred),
                ..Default::default()
            }),
            attestation: Some(self.ceremony.attestation),
            extensions: None,
        })
    }
}

#[async_trait::async_trait]
impl AssertionOptionsProvider for DefaultOptionsProvider {
    // ---
    async fn provide(&self, username: Option<&str>) -> Result<AssertionOptions> {
        // ---
        let allowed = match username {
            Some(username) => self.descriptors(username).await?,
            None => Vec::new(),
        };

        Ok(AssertionOptions {
            challenge: Challenge::new(self.codec.random_bytes()),
            timeout: self.timeout_ms(),
            rp_id: Some(self.rp.id.clone()),
            allow_credentials: Some(allowed),
            user_verification: Some(UserVerificationRequirement::Preferred),
            extensions: None,
        })
    }
}
