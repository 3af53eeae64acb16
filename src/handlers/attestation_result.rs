//! `POST /webauthn/attestation/result`
//!
//! Completes a registration. Every structural and policy check runs before the
//! verifier sees the credential, and nothing is persisted unless all of them pass.

use super::ceremony::{consume_challenge, server_property, CeremonyRequestHandler};
use super::shared_types::Empty;
use crate::app_state::{CeremonyServices, RelyingParty};
use crate::ceremony::{
    check_transports, check_user_flags, AttestationObject, AttestationResultRequest,
    ChallengeCodec, CollectedClientData, CredentialValidator,
};
use crate::domain::{
    Ceremony, CeremonyError, ChallengeFormatError, ChallengeStorePtr, CredentialRecord,
    CredentialRecordStorePtr, CredentialVerifierPtr, User, UserDirectoryPtr,
    UsernameNotFoundHandlerPtr, VerificationError,
};

pub struct AttestationResultHandler {
    relying_party: RelyingParty,
    codec: ChallengeCodec,
    validator: CredentialValidator,
    challenge_store: ChallengeStorePtr,
    users: UserDirectoryPtr,
    credentials: CredentialRecordStorePtr,
    verifier: CredentialVerifierPtr,
    username_not_found: UsernameNotFoundHandlerPtr,
}

impl AttestationResultHandler {
    // ---
    pub fn new(services: &CeremonyServices) -> Self {
        // ---
        Self {
            relying_party: services.relying_party.clone(),
            codec: services.codec,
            validator: CredentialValidator,
            challenge_store: services.challenge_store.clone(),
            users: services.users.clone(),
            credentials: services.credentials.clone(),
            verifier: services.verifier.clone(),
            username_not_found: services.username_not_found.clone(),
        }
    }

    async fn resolve_user(&self, username: &str) -> Result<User, CeremonyError> {
        // ---
        match self.users.lookup(username).await? {
            Some(user) => Ok(user),
            None => self.username_not_found.on_username_not_found(username).await,
        }
    }
}

#[async_trait::async_trait]
impl CeremonyRequestHandler for AttestationResultHandler {
    // ---
    type Request = AttestationResultRequest;
    type Response = Empty;

    const CEREMONY: Ceremony = Ceremony::Attestation;
    const PHASE: &'static str = "result";

    async fn handle(&self, request: AttestationResultRequest) -> Result<Empty, CeremonyError> {
        // ---
        let payload = self.validator.validate_attestation(&request)?;

        let client_data = CollectedClientData::parse(&payload.client_data_json)?;
        client_data.ensure_type(Self::CEREMONY)?;
        let challenge = client_data.challenge;
        consume_challenge(&self.challenge_store, Self::CEREMONY, &challenge).await?;

        let metadata = self.codec.decode(&challenge)?;
        let username = metadata
            .username
            .ok_or(ChallengeFormatError::MissingUsername)?;
        let user = self.resolve_user(&username).await?;

        let attestation = AttestationObject::parse(&payload.attestation_object)?;
        let auth_data = attestation.authenticator_data()?;
        check_user_flags(&auth_data, metadata.user_verification)?;

        let attested = auth_data
            .attested_credential
            .as_ref()
            .ok_or(VerificationError::MissingAttestedCredential)?;
        if attested.credential_id != payload.raw_id {
            return Err(VerificationError::CredentialIdMismatch.into());
        }
        if self.credentials.find_by_id(&payload.raw_id).await?.is_some() {
            return Err(VerificationError::CredentialAlreadyRegistered.into());
        }

        let expected = server_property(&self.relying_party, challenge, metadata.user_verification);
        check_transports(&expected.allowed_transports, &payload.transports)?;
        let verified = self.verifier.verify_registration(&payload, &user, &expected)?;

        let record = CredentialRecord::new(
            verified.credential_id,
            &user,
            verified.public_key,
            auth_data.sign_count,
        )
        .with_transports(payload.transports)
        .with_attestation(attestation.fmt, attested.aaguid);
        let credential_id = record.id_hex();
        self.credentials.create(record).await?;

        tracing::info!(
            username = %user.username,
            credential_id = %credential_id,
            "Registered credential"
        );
        Ok(Empty {})
    }
}
