//! `POST /webauthn/attestation/options`
//!
//! Starts a registration: asks the options provider for creation options and embeds
//! the requested user-verification level and the username in the challenge before
//! storing it. The stored challenge is the only side effect; an unknown username is
//! left to the result phase.

use super::ceremony::{encode_challenge, save_challenge, CeremonyRequestHandler};
use crate::app_state::CeremonyServices;
use crate::ceremony::{AttestationOptionsRequest, ChallengeCodec, MAX_USERNAME_BYTES};
use crate::domain::{
    merge_extensions, AttestationOptions, AttestationOptionsProviderPtr, Ceremony, CeremonyError,
    ChallengeStorePtr, User, UserDirectoryPtr,
};

pub struct AttestationOptionsHandler {
    codec: ChallengeCodec,
    challenge_store: ChallengeStorePtr,
    users: UserDirectoryPtr,
    provider: AttestationOptionsProviderPtr,
}

impl AttestationOptionsHandler {
    // ---
    pub fn new(services: &CeremonyServices) -> Self {
        // ---
        Self {
            codec: services.codec,
            challenge_store: services.challenge_store.clone(),
            users: services.users.clone(),
            provider: services.attestation_options.clone(),
        }
    }

    /// The stored user, or an unsaved one for a username the directory does not know.
    async fn resolve_user(
        &self,
        username: &str,
        display_name: &str,
    ) -> Result<User, CeremonyError> {
        // ---
        let user = self.users.lookup(username).await?;
        Ok(user.unwrap_or_else(|| User::new(username.to_string(), display_name.to_string())))
    }
}

#[async_trait::async_trait]
impl CeremonyRequestHandler for AttestationOptionsHandler {
    // ---
    type Request = AttestationOptionsRequest;
    type Response = AttestationOptions;

    const CEREMONY: Ceremony = Ceremony::Attestation;
    const PHASE: &'static str = "options";

    async fn handle(
        &self,
        request: AttestationOptionsRequest,
    ) -> Result<AttestationOptions, CeremonyError> {
        // ---
        let username = request
            .username
            .filter(|name| !name.is_empty())
            .ok_or_else(|| CeremonyError::malformed("username is required"))?;
        let display_name = request
            .display_name
            .ok_or_else(|| CeremonyError::malformed("displayName is required"))?;
        if username.len() > MAX_USERNAME_BYTES {
            return Err(CeremonyError::malformed(format!(
                "username is longer than {MAX_USERNAME_BYTES} bytes"
            )));
        }

        let user = self.resolve_user(&username, &display_name).await?;
        let mut options = self.provider.provide(&user).await?;

        if let Some(selection) = request.authenticator_selection {
            options.authenticator_selection = Some(selection);
        }
        if let Some(attestation) = request.attestation {
            options.attestation = Some(attestation);
        }
        options.extensions = merge_extensions(options.extensions.take(), request.extensions);

        let user_verification = options.user_verification();
        options.challenge = encode_challenge(
            &self.codec,
            &options.challenge,
            user_verification,
            Some(&user.username),
        )?;
        save_challenge(&self.challenge_store, Self::CEREMONY, &options.challenge).await?;

        tracing::debug!(
            username = %user.username,
            user_verification = user_verification.as_str(),
            "Issued attestation challenge"
        );
        Ok(options)
    }
}
