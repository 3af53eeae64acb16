//! Application state management.
//!
//! [`CeremonyServices`] is the dependency-injection container for the
//! ceremony endpoints: every collaborator a handler needs is passed in
//! explicitly, nothing is looked up from a global registry. [`AppState`] is
//! the smaller slice of it that the ambient endpoints (health, metrics) use.
//!
//! Both are cheaply cloneable (`Arc` internally) so axum can hand a copy to
//! each request.

use crate::ceremony::ChallengeCodec;
use crate::domain::{
    AssertionOptionsProviderPtr, AttestationOptionsProviderPtr, ChallengeStorePtr,
    CredentialRecordStorePtr, CredentialVerifierPtr, MetricsPtr, UserDirectoryPtr,
    UsernameNotFoundHandlerPtr,
};

/// Relying-party values the result phase checks client data against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelyingParty {
    pub id: String,
    pub origin: String,
    /// Empty accepts any transport.
    pub allowed_transports: Vec<String>,
}

/// Every collaborator of the four ceremony endpoints.
///
/// # Lifecycle
///
/// 1. Built once in `create_router()` from configuration, or by a test
///    with in-memory and stub implementations
/// 2. Each ceremony handler copies out the fields it needs
/// 3. Never mutated afterwards
#[derive(Clone)]
pub struct CeremonyServices {
    pub relying_party: RelyingParty,

    /// Embeds and recovers ceremony metadata in challenge bytes.
    pub codec: ChallengeCodec,

    /// Single-use, TTL-bound storage of issued challenges.
    pub challenge_store: ChallengeStorePtr,

    pub users: UserDirectoryPtr,

    pub credentials: CredentialRecordStorePtr,

    pub attestation_options: AttestationOptionsProviderPtr,

    pub assertion_options: AssertionOptionsProviderPtr,

    /// Attestation-statement and signature verification.
    pub verifier: CredentialVerifierPtr,

    /// Policy for usernames unknown at attestation result.
    pub username_not_found: UsernameNotFoundHandlerPtr,

    pub metrics: MetricsPtr,
}

/// Shared state of the non-ceremony endpoints.
#[derive(Clone)]
pub(crate) struct AppState {
    /// Pinged by the full health check.
    challenge_store: ChallengeStorePtr,

    /// Metrics implementation for recording application events.
    ///
    /// Either Prometheus-backed (production) or no-op (testing/development).
    metrics: MetricsPtr,
}

impl AppState {
    // ---
    pub fn new(challenge_store: ChallengeStorePtr, metrics: MetricsPtr) -> Self {
        // ---
        AppState {
            challenge_store,
            metrics,
        }
    }

    /// Get a reference to the challenge store.
    pub(crate) fn challenge_store(&self) -> &ChallengeStorePtr {
        // ---
        &self.challenge_store
    }

    /// Get a reference to the metrics implementation.
    pub(crate) fn metrics(&self) -> &MetricsPtr {
        // ---
        &self.metrics
    }
}

impl From<&CeremonyServices> for AppState {
    fn from(services: &CeremonyServices) -> Self {
        AppState::new(services.challenge_store.clone(), services.metrics.clone())
    }
}
