//! Plumbing shared by the four ceremony endpoints.
//!
//! Each endpoint is a [`CeremonyRequestHandler`]; [`route`] turns one into an axum
//! POST route that parses the body, records the outcome and renders the envelope.

use super::shared_types::ServerResponse;
use crate::app_state::RelyingParty;
use crate::ceremony::ChallengeCodec;
use crate::domain::{
    Ceremony, CeremonyError, Challenge, ChallengeContext, ChallengeFormatError,
    ChallengeStorePtr, MetricsPtr, ServerProperty, UserVerificationRequirement,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{post, MethodRouter};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// One phase of one ceremony.
#[async_trait::async_trait]
pub trait CeremonyRequestHandler: Send + Sync + 'static {
    // ---
    type Request: DeserializeOwned + Send + 'static;
    type Response: Serialize + Send;

    const CEREMONY: Ceremony;

    /// `options` or `result`, used as a metrics label.
    const PHASE: &'static str;

    async fn handle(&self, request: Self::Request) -> Result<Self::Response, CeremonyError>;
}

pub(crate) struct HandlerState<H> {
    handler: Arc<H>,
    metrics: MetricsPtr,
}

impl<H> Clone for HandlerState<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// POST route serving `handler`.
pub(crate) fn route<H, S>(handler: H, metrics: MetricsPtr) -> MethodRouter<S>
where
    H: CeremonyRequestHandler,
    S: Clone + Send + Sync + 'static,
{
    // ---
    post(serve::<H>).with_state(HandlerState {
        handler: Arc::new(handler),
        metrics,
    })
}

async fn serve<H: CeremonyRequestHandler>(
    State(state): State<HandlerState<H>>,
    payload: Result<Json<H::Request>, JsonRejection>,
) -> Response {
    // ---
    let result = match payload {
        Ok(Json(request)) => state.handler.handle(request).await,
        Err(rejection) => Err(CeremonyError::malformed(rejection.body_text())),
    };

    let outcome = match &result {
        Ok(_) => "ok",
        Err(err) => err.kind(),
    };
    state
        .metrics
        .record_ceremony(H::CEREMONY.as_str(), H::PHASE, outcome);

    match result {
        Ok(body) => ServerResponse::ok(body).into_response(),
        Err(err) => err.into_response(),
    }
}

// ---

/// Embed ceremony metadata into the provider's random challenge.
pub(crate) fn encode_challenge(
    codec: &ChallengeCodec,
    random: &Challenge,
    user_verification: UserVerificationRequirement,
    username: Option<&str>,
) -> Result<Challenge, CeremonyError> {
    // ---
    codec
        .encode(random.as_bytes(), user_verification, username)
        .map_err(|err| match err {
            ChallengeFormatError::UsernameTooLong(_) => CeremonyError::malformed(err.to_string()),
            other => CeremonyError::Internal(anyhow::anyhow!(
                "options provider returned an unusable challenge: {other}"
            )),
        })
}

pub(crate) async fn save_challenge(
    store: &ChallengeStorePtr,
    ceremony: Ceremony,
    challenge: &Challenge,
) -> Result<(), CeremonyError> {
    // ---
    let context = ChallengeContext::new(ceremony, challenge);
    store.save(&context, challenge).await?;
    Ok(())
}

/// Take the issued challenge out of the store. The stored value must be the one
/// the client echoed back.
pub(crate) async fn consume_challenge(
    store: &ChallengeStorePtr,
    ceremony: Ceremony,
    challenge: &Challenge,
) -> Result<(), CeremonyError> {
    // ---
    let context = ChallengeContext::new(ceremony, challenge);
    match store.consume(&context).await? {
        Some(stored) if stored == *challenge => Ok(()),
        _ => Err(CeremonyError::ChallengeNotFound),
    }
}

pub(crate) fn server_property(
    relying_party: &RelyingParty,
    challenge: Challenge,
    user_verification: UserVerificationRequirement,
) -> ServerProperty {
    // ---
    ServerProperty {
        origin: relying_party.origin.clone(),
        rp_id: relying_party.id.clone(),
        challenge,
        user_verification_required: user_verification.is_required(),
        allowed_transports: relying_party.allowed_transports.clone(),
    }
}
