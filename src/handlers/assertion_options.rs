//! `POST /webauthn/assertion/options`
//!
//! Without a username the allow list is empty and the client falls back to
//! discoverable credentials.

use super::ceremony::{encode_challenge, save_challenge, CeremonyRequestHandler};
use crate::app_state::CeremonyServices;
use crate::ceremony::{AssertionOptionsRequest, ChallengeCodec};
use crate::domain::{
    merge_extensions, AssertionOptions, AssertionOptionsProviderPtr, Ceremony, CeremonyError,
    ChallengeStorePtr,
};

pub struct AssertionOptionsHandler {
    codec: ChallengeCodec,
    challenge_store: ChallengeStorePtr,
    provider: AssertionOptionsProviderPtr,
}

impl AssertionOptionsHandler {
    // ---
    pub fn new(services: &CeremonyServices) -> Self {
        // ---
        Self {
            codec: services.codec,
            challenge_store: services.challenge_store.clone(),
            provider: services.assertion_options.clone(),
        }
    }
}

#[async_trait::async_trait]
impl CeremonyRequestHandler for AssertionOptionsHandler {
    // ---
    type Request = AssertionOptionsRequest;
    type Response = AssertionOptions;

    const CEREMONY: Ceremony = Ceremony::Assertion;
    const PHASE: &'static str = "options";

    async fn handle(
        &self,
        request: AssertionOptionsRequest,
    ) -> Result<AssertionOptions, CeremonyError> {
        // ---
        let username = request.username.filter(|name| !name.is_empty());
        let user_verification = request.user_verification.unwrap_or_default();

        let mut options = self.provider.provide(username.as_deref()).await?;
        options.challenge = encode_challenge(
            &self.codec,
            &options.challenge,
            user_verification,
            username.as_deref(),
        )?;
        save_challenge(&self.challenge_store, Self::CEREMONY, &options.challenge).await?;

        options.user_verification = Some(user_verification);
        options.extensions = merge_extensions(options.extensions.take(), request.extensions);

        tracing::debug!(
            username = username.as_deref().unwrap_or("<discoverable>"),
            user_verification = user_verification.as_str(),
            "Issued assertion challenge"
        );
        Ok(options)
    }
}
