//! `POST /webauthn/assertion/result`

use super::ceremony::{consume_challenge, server_property, CeremonyRequestHandler};
use super::shared_types::Empty;
use crate::app_state::{CeremonyServices, RelyingParty};
use crate::ceremony::{
    check_counter, check_user_flags, AssertionResultRequest, AuthenticatorData, ChallengeCodec,
    CollectedClientData, CredentialValidator,
};
use crate::domain::{
    AssertionPayload, Ceremony, CeremonyError, ChallengeMetadata, ChallengeStorePtr,
    CredentialRecord, CredentialRecordStorePtr, CredentialVerifierPtr, VerificationError,
};
use chrono::Utc;

pub struct AssertionResultHandler {
    relying_party: RelyingParty,
    codec: ChallengeCodec,
    validator: CredentialValidator,
    challenge_store: ChallengeStorePtr,
    credentials: CredentialRecordStorePtr,
    verifier: CredentialVerifierPtr,
}

impl AssertionResultHandler {
    // ---
    pub fn new(services: &CeremonyServices) -> Self {
        // ---
        Self {
            relying_party: services.relying_party.clone(),
            codec: services.codec,
            validator: CredentialValidator,
            challenge_store: services.challenge_store.clone(),
            credentials: services.credentials.clone(),
            verifier: services.verifier.clone(),
        }
    }
}

/// The credential must belong to the user the challenge was issued for, and to the
/// user the authenticator says it is speaking for.
fn check_ownership(
    record: &CredentialRecord,
    metadata: &ChallengeMetadata,
    payload: &AssertionPayload,
) -> Result<(), VerificationError> {
    // ---
    if let Some(username) = &metadata.username {
        if record.username != *username {
            return Err(VerificationError::CredentialNotOwned);
        }
    }
    if let Some(handle) = &payload.user_handle {
        if handle.as_slice() != record.user_id.as_bytes() {
            return Err(VerificationError::UserHandleMismatch);
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl CeremonyRequestHandler for AssertionResultHandler {
    // ---
    type Request = AssertionResultRequest;
    type Response = Empty;

    const CEREMONY: Ceremony = Ceremony::Assertion;
    const PHASE: &'static str = "result";

    async fn handle(&self, request: AssertionResultRequest) -> Result<Empty, CeremonyError> {
        // ---
        let payload = self.validator.validate_assertion(&request)?;

        let client_data = CollectedClientData::parse(&payload.client_data_json)?;
        client_data.ensure_type(Self::CEREMONY)?;
        let challenge = client_data.challenge;
        consume_challenge(&self.challenge_store, Self::CEREMONY, &challenge).await?;

        let metadata = self.codec.decode(&challenge)?;
        let auth_data = AuthenticatorData::parse(&payload.authenticator_data)?;
        check_user_flags(&auth_data, metadata.user_verification)?;

        let mut record = self
            .credentials
            .find_by_id(&payload.raw_id)
            .await?
            .ok_or(VerificationError::UnknownCredential)?;
        check_ownership(&record, &metadata, &payload)?;

        let expected = server_property(&self.relying_party, challenge, metadata.user_verification);
        let verified = self
            .verifier
            .verify_authentication(&payload, &record, &expected)?;
        check_counter(record.counter, auth_data.sign_count)?;

        record.counter = auth_data.sign_count;
        if let Some(public_key) = verified.public_key {
            record.public_key = public_key;
        }
        record.last_used_at = Some(Utc::now());

        let username = record.username.clone();
        let credential_id = record.id_hex();
        self.credentials.update(record).await?;

        tracing::info!(
            username = %username,
            credential_id = %credential_id,
            user_verified = verified.user_verified,
            "Authenticated"
        );
        Ok(Empty {})
    }
}
